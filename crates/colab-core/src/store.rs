//! In-memory entity arena, playing the persistence-collaborator role.
//!
//! All entities live in per-kind maps keyed by id; relationships are id
//! references. The "collection on the owner side" views (variants of a
//! card, sub-cards of a content, direct references of a resource, ...)
//! are derived indices maintained exclusively by the mutators here, so
//! the two sides of a relationship can never drift apart.
//!
//! Ids are allocated from a deterministic counter: the same sequence of
//! operations always produces the same ids, which the property-based
//! tests rely on.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use tracing::debug;

use colab_api::{
    Card, CardContent, CardContentId, CardId, CardParent, CardTypeEntity, CardTypeId, ColabError,
    DeletionStatus, Document, DocumentId, Project, ProjectId, ResourceEntity, ResourceId,
    ResourceOwner, Result,
};

/// The object graph one transaction operates on.
#[derive(Debug, Default)]
pub struct ColabStore {
    next_id: u64,

    projects: HashMap<ProjectId, Project>,
    cards: HashMap<CardId, Card>,
    contents: HashMap<CardContentId, CardContent>,
    card_types: HashMap<CardTypeId, CardTypeEntity>,
    resources: HashMap<ResourceId, ResourceEntity>,
    documents: HashMap<DocumentId, Document>,

    // Derived indices; insertion order is the stable iteration order.
    contents_by_card: HashMap<CardId, Vec<CardContentId>>,
    cards_by_parent: HashMap<CardContentId, Vec<CardId>>,
    types_by_project: HashMap<ProjectId, Vec<CardTypeId>>,
    cards_by_type: HashMap<CardTypeId, Vec<CardId>>,
    type_refs_by_target: HashMap<CardTypeId, Vec<CardTypeId>>,
    resources_by_owner: HashMap<ResourceOwner, Vec<ResourceId>>,
    resource_refs_by_target: HashMap<ResourceId, Vec<ResourceId>>,
}

fn unindex<K: Eq + Hash, V: PartialEq>(map: &mut HashMap<K, Vec<V>>, key: &K, value: &V) {
    if let Some(values) = map.get_mut(key) {
        values.retain(|v| v != value);
        if values.is_empty() {
            map.remove(key);
        }
    }
}

fn slice_of<'a, K: Eq + Hash, V>(map: &'a HashMap<K, Vec<V>>, key: &K) -> &'a [V] {
    map.get(key).map(Vec::as_slice).unwrap_or(&[])
}

impl ColabStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next entity id.
    pub fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    // ------------------------------------------------------------------
    // Lookups: `find_*` returns Option (DAO contract), the short-named
    // getters convert a miss into a not-found error at the boundary.
    // ------------------------------------------------------------------

    pub fn find_project(&self, id: ProjectId) -> Option<&Project> {
        self.projects.get(&id)
    }

    pub fn project(&self, id: ProjectId) -> Result<&Project> {
        self.find_project(id)
            .ok_or_else(|| ColabError::not_found("project", id))
    }

    pub fn find_card(&self, id: CardId) -> Option<&Card> {
        self.cards.get(&id)
    }

    pub fn card(&self, id: CardId) -> Result<&Card> {
        self.find_card(id)
            .ok_or_else(|| ColabError::not_found("card", id))
    }

    pub fn card_mut(&mut self, id: CardId) -> Result<&mut Card> {
        self.cards
            .get_mut(&id)
            .ok_or_else(|| ColabError::not_found("card", id))
    }

    pub fn find_card_content(&self, id: CardContentId) -> Option<&CardContent> {
        self.contents.get(&id)
    }

    pub fn card_content(&self, id: CardContentId) -> Result<&CardContent> {
        self.find_card_content(id)
            .ok_or_else(|| ColabError::not_found("card content", id))
    }

    pub fn card_content_mut(&mut self, id: CardContentId) -> Result<&mut CardContent> {
        self.contents
            .get_mut(&id)
            .ok_or_else(|| ColabError::not_found("card content", id))
    }

    pub fn find_card_type(&self, id: CardTypeId) -> Option<&CardTypeEntity> {
        self.card_types.get(&id)
    }

    pub fn card_type(&self, id: CardTypeId) -> Result<&CardTypeEntity> {
        self.find_card_type(id)
            .ok_or_else(|| ColabError::not_found("card type", id))
    }

    pub fn card_type_mut(&mut self, id: CardTypeId) -> Result<&mut CardTypeEntity> {
        self.card_types
            .get_mut(&id)
            .ok_or_else(|| ColabError::not_found("card type", id))
    }

    pub fn find_resource(&self, id: ResourceId) -> Option<&ResourceEntity> {
        self.resources.get(&id)
    }

    pub fn resource(&self, id: ResourceId) -> Result<&ResourceEntity> {
        self.find_resource(id)
            .ok_or_else(|| ColabError::not_found("resource", id))
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> Result<&mut ResourceEntity> {
        self.resources
            .get_mut(&id)
            .ok_or_else(|| ColabError::not_found("resource", id))
    }

    pub fn find_document(&self, id: DocumentId) -> Option<&Document> {
        self.documents.get(&id)
    }

    pub fn document(&self, id: DocumentId) -> Result<&Document> {
        self.find_document(id)
            .ok_or_else(|| ColabError::not_found("document", id))
    }

    // ------------------------------------------------------------------
    // Persist / remove
    // ------------------------------------------------------------------

    pub fn persist_project(&mut self, project: Project) {
        debug!(project = %project.id, "persist project");
        self.projects.insert(project.id, project);
    }

    pub fn persist_card(&mut self, card: Card) {
        debug!(card = %card.id, "persist card");
        if let CardParent::Content { parent } = card.parent {
            self.cards_by_parent.entry(parent).or_default().push(card.id);
        }
        if let Some(ty) = card.card_type {
            self.cards_by_type.entry(ty).or_default().push(card.id);
        }
        self.cards.insert(card.id, card);
    }

    pub fn persist_card_content(&mut self, content: CardContent) {
        debug!(content = %content.id, card = %content.card, "persist card content");
        self.contents_by_card
            .entry(content.card)
            .or_default()
            .push(content.id);
        self.contents.insert(content.id, content);
    }

    pub fn persist_card_type(&mut self, entity: CardTypeEntity) {
        debug!(card_type = %entity.id, "persist card type");
        if let Some(project) = entity.project {
            self.types_by_project
                .entry(project)
                .or_default()
                .push(entity.id);
        }
        if let Some(target) = entity.target() {
            self.type_refs_by_target
                .entry(target)
                .or_default()
                .push(entity.id);
        }
        self.card_types.insert(entity.id, entity);
    }

    pub fn persist_resource(&mut self, entity: ResourceEntity) {
        debug!(resource = %entity.id, "persist resource");
        self.resources_by_owner
            .entry(entity.owner)
            .or_default()
            .push(entity.id);
        if let Some(target) = entity.target() {
            self.resource_refs_by_target
                .entry(target)
                .or_default()
                .push(entity.id);
        }
        self.resources.insert(entity.id, entity);
    }

    pub fn create_document(&mut self, body: impl Into<String>) -> DocumentId {
        let id = DocumentId(self.next_id());
        self.documents.insert(id, Document::new(id, body));
        id
    }

    pub fn remove_card(&mut self, id: CardId) -> Result<Card> {
        let card = self
            .cards
            .remove(&id)
            .ok_or_else(|| ColabError::not_found("card", id))?;
        if let CardParent::Content { parent } = card.parent {
            unindex(&mut self.cards_by_parent, &parent, &id);
        }
        if let Some(ty) = card.card_type {
            unindex(&mut self.cards_by_type, &ty, &id);
        }
        self.contents_by_card.remove(&id);
        debug!(card = %id, "removed card");
        Ok(card)
    }

    pub fn remove_card_content(&mut self, id: CardContentId) -> Result<CardContent> {
        let content = self
            .contents
            .remove(&id)
            .ok_or_else(|| ColabError::not_found("card content", id))?;
        unindex(&mut self.contents_by_card, &content.card, &id);
        self.cards_by_parent.remove(&id);
        debug!(content = %id, "removed card content");
        Ok(content)
    }

    pub fn remove_card_type(&mut self, id: CardTypeId) -> Result<CardTypeEntity> {
        let entity = self
            .card_types
            .remove(&id)
            .ok_or_else(|| ColabError::not_found("card type", id))?;
        if let Some(project) = entity.project {
            unindex(&mut self.types_by_project, &project, &id);
        }
        if let Some(target) = entity.target() {
            unindex(&mut self.type_refs_by_target, &target, &id);
        }
        self.type_refs_by_target.remove(&id);
        self.cards_by_type.remove(&id);
        debug!(card_type = %id, "removed card type");
        Ok(entity)
    }

    pub fn remove_resource(&mut self, id: ResourceId) -> Result<ResourceEntity> {
        let entity = self
            .resources
            .remove(&id)
            .ok_or_else(|| ColabError::not_found("resource", id))?;
        unindex(&mut self.resources_by_owner, &entity.owner, &id);
        if let Some(target) = entity.target() {
            unindex(&mut self.resource_refs_by_target, &target, &id);
        }
        self.resource_refs_by_target.remove(&id);
        debug!(resource = %id, "removed resource");
        Ok(entity)
    }

    pub fn remove_document(&mut self, id: DocumentId) {
        self.documents.remove(&id);
    }

    // ------------------------------------------------------------------
    // Relationship mutators
    // ------------------------------------------------------------------

    /// Detach a card from its current parent content and attach it under
    /// another one. The root card of a project never reparents.
    pub fn reparent_card(&mut self, id: CardId, new_parent: CardContentId) -> Result<()> {
        let old_parent = match self.card(id)?.parent {
            CardParent::Root { .. } => {
                return Err(ColabError::integrity(format!(
                    "card {id} is a project root and cannot be reparented"
                )))
            }
            CardParent::Content { parent } => parent,
        };
        self.card_content(new_parent)?;
        unindex(&mut self.cards_by_parent, &old_parent, &id);
        self.cards_by_parent.entry(new_parent).or_default().push(id);
        self.card_mut(id)?.parent = CardParent::Content { parent: new_parent };
        debug!(card = %id, from = %old_parent, to = %new_parent, "reparented card");
        Ok(())
    }

    /// Change the card-type link of a card, keeping the implementing-cards
    /// index in step.
    pub fn set_card_type(&mut self, id: CardId, card_type: Option<CardTypeId>) -> Result<()> {
        let previous = self.card(id)?.card_type;
        if let Some(old) = previous {
            unindex(&mut self.cards_by_type, &old, &id);
        }
        if let Some(new) = card_type {
            self.card_type(new)?;
            self.cards_by_type.entry(new).or_default().push(id);
        }
        self.card_mut(id)?.card_type = card_type;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Derived collections
    // ------------------------------------------------------------------

    /// Content variants of a card, in creation order.
    pub fn variants_of(&self, card: CardId) -> &[CardContentId] {
        slice_of(&self.contents_by_card, &card)
    }

    pub fn alive_variants_of(&self, card: CardId) -> Vec<CardContentId> {
        self.variants_of(card)
            .iter()
            .copied()
            .filter(|&id| {
                self.find_card_content(id)
                    .is_some_and(|c| c.deletion.is_alive())
            })
            .collect()
    }

    /// Sub-cards of a content, in creation order.
    pub fn subcards_of(&self, content: CardContentId) -> &[CardId] {
        slice_of(&self.cards_by_parent, &content)
    }

    pub fn alive_subcards_of(&self, content: CardContentId) -> Vec<CardId> {
        self.subcards_of(content)
            .iter()
            .copied()
            .filter(|&id| self.find_card(id).is_some_and(|c| c.deletion.is_alive()))
            .collect()
    }

    /// Types and type references directly owned by a project.
    pub fn types_of_project(&self, project: ProjectId) -> &[CardTypeId] {
        slice_of(&self.types_by_project, &project)
    }

    /// Cards whose `card_type` is exactly this type or reference.
    pub fn implementing_cards(&self, card_type: CardTypeId) -> &[CardId] {
        slice_of(&self.cards_by_type, &card_type)
    }

    /// Card-type references whose direct target is this type or reference.
    pub fn direct_type_refs(&self, target: CardTypeId) -> &[CardTypeId] {
        slice_of(&self.type_refs_by_target, &target)
    }

    /// Resources and references directly owned by one node.
    pub fn resources_of(&self, owner: ResourceOwner) -> &[ResourceId] {
        slice_of(&self.resources_by_owner, &owner)
    }

    /// Resource references whose direct target is this resource.
    pub fn direct_resource_refs(&self, target: ResourceId) -> &[ResourceId] {
        slice_of(&self.resource_refs_by_target, &target)
    }

    // ------------------------------------------------------------------
    // Tree traversals (iterative, cycle tolerant)
    // ------------------------------------------------------------------

    /// Project a card ultimately belongs to, walking up parent contents.
    pub fn project_of_card(&self, card: CardId) -> Result<ProjectId> {
        let mut seen = HashSet::new();
        let mut current = card;
        loop {
            if !seen.insert(current) {
                return Err(ColabError::integrity(format!(
                    "card hierarchy above card {card} contains a cycle"
                )));
            }
            match self.card(current)?.parent {
                CardParent::Root { project } => return Ok(project),
                CardParent::Content { parent } => current = self.card_content(parent)?.card,
            }
        }
    }

    pub fn project_of_content(&self, content: CardContentId) -> Result<ProjectId> {
        self.project_of_card(self.card_content(content)?.card)
    }

    /// The first alive content variant of a project's root card.
    pub fn root_content_of(&self, project: ProjectId) -> Result<CardContentId> {
        let root_card = self.project(project)?.root_card;
        self.alive_variants_of(root_card)
            .first()
            .copied()
            .ok_or_else(|| {
                ColabError::integrity(format!(
                    "project {project}: root card has no alive content variant"
                ))
            })
    }

    /// True when any ancestor card of the given card is soft-deleted.
    pub fn is_any_ancestor_card_deleted(&self, card: CardId) -> Result<bool> {
        let mut seen = HashSet::new();
        let mut current = card;
        loop {
            if !seen.insert(current) {
                return Err(ColabError::integrity(format!(
                    "card hierarchy above card {card} contains a cycle"
                )));
            }
            match self.card(current)?.parent {
                CardParent::Root { .. } => return Ok(false),
                CardParent::Content { parent } => {
                    let ancestor = self.card_content(parent)?.card;
                    if self.card(ancestor)?.deletion.is_deleted() {
                        return Ok(true);
                    }
                    current = ancestor;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Sweep queries
    // ------------------------------------------------------------------

    /// Cards in the given deletion status whose erasure was requested at or
    /// before the cutoff, ordered by id for a deterministic sweep.
    pub fn cards_deleted_before(
        &self,
        status: DeletionStatus,
        cutoff: DateTime<Utc>,
    ) -> Vec<CardId> {
        let mut ids: Vec<CardId> = self
            .cards
            .values()
            .filter(|c| {
                c.deletion.status == Some(status)
                    && c.deletion
                        .erasure_requested_at
                        .is_some_and(|at| at <= cutoff)
            })
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }

    /// Same as [`ColabStore::cards_deleted_before`] for card contents.
    pub fn contents_deleted_before(
        &self,
        status: DeletionStatus,
        cutoff: DateTime<Utc>,
    ) -> Vec<CardContentId> {
        let mut ids: Vec<CardContentId> = self
            .contents
            .values()
            .filter(|c| {
                c.deletion.status == Some(status)
                    && c.deletion
                        .erasure_requested_at
                        .is_some_and(|at| at <= cutoff)
            })
            .map(|c| c.id)
            .collect();
        ids.sort();
        ids
    }
}
