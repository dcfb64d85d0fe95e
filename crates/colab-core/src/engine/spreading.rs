//! Resource-reference spreading.
//!
//! Every card, card content and card-type reference holds a resource
//! reference for each resource visible to it from above: its card type,
//! its parent card, its parent card content. This module creates, revives
//! and disables those reference chains as a side effect of resource and
//! structural changes; references are never created by a user-facing
//! operation directly.
//!
//! Broken target chains are tolerated everywhere: `resolve` returning
//! `None` means "no concrete resource yet", an intermediate state, not an
//! error. Traversals are iterative worklists with seen-sets so corrupt
//! cyclic data cannot hang or overflow the stack.

use std::collections::HashSet;
use tracing::debug;

use colab_api::{
    CardContentId, CardId, CardTypeId, ColabError, ResourceEntity, ResourceId, ResourceKind,
    ResourceOwner, ResourceRefData, Result,
};

use crate::security::SpreadAuthority;
use crate::store::ColabStore;

/// Follow the reference chain down to the concrete resource.
///
/// `None` on a dangling target or cycle.
pub fn resolve(store: &ColabStore, id: ResourceId) -> Option<ResourceId> {
    let mut seen = HashSet::new();
    let mut current = id;
    loop {
        if !seen.insert(current) {
            return None;
        }
        match store.find_resource(current)?.target() {
            None => return Some(current),
            Some(target) => current = target,
        }
    }
}

/// Spreading policy for one resource-or-reference.
///
/// Everything spreads to its descendants except a reference attached to a
/// card content that resolves to a concrete resource with no card-type
/// link: those stay within their card (type-scoped resources reach
/// sub-cards through the type graph instead).
pub fn must_spread_reference(store: &ColabStore, id: ResourceId) -> bool {
    let Some(entity) = store.find_resource(id) else {
        return false;
    };
    if !matches!(entity.owner, ResourceOwner::Content { .. }) {
        return true;
    }
    match resolve(store, id).and_then(|concrete| store.find_resource(concrete)) {
        // Unresolved chain: keep spreading, the terminus may appear later.
        None => true,
        Some(concrete) => matches!(concrete.owner, ResourceOwner::CardType { .. }),
    }
}

/// Category and refused flag for a reference freshly created from `target`.
///
/// The category is copied. The reference starts refused when the target
/// chain resolves to a deprecated concrete resource; otherwise it copies
/// the target's own refusal.
fn init_from_target(store: &ColabStore, target: ResourceId) -> Result<(Option<String>, bool)> {
    let entity = store.resource(target)?;
    let category = entity.category.clone();
    let refused = match &entity.kind {
        ResourceKind::Concrete(data) => data.deprecated,
        ResourceKind::Ref(data) => {
            let resolves_deprecated = resolve(store, target)
                .and_then(|concrete| store.find_resource(concrete))
                .and_then(ResourceEntity::as_concrete)
                .is_some_and(|concrete| concrete.deprecated);
            resolves_deprecated || data.refused
        }
    };
    Ok((category, refused))
}

/// Reuse the owner's existing reference to `target` (clearing its residual
/// marker) or create a new one. At most one reference per (owner, target)
/// pair ever exists.
fn get_or_create_ref(
    store: &mut ColabStore,
    target: ResourceId,
    owner: ResourceOwner,
) -> Result<ResourceId> {
    let existing = store.resources_of(owner).iter().copied().find(|&id| {
        store
            .find_resource(id)
            .and_then(ResourceEntity::target)
            == Some(target)
    });
    if let Some(id) = existing {
        if let Some(data) = store.resource_mut(id)?.as_reference_mut() {
            data.residual = false;
        }
        debug!(reference = %id, %target, "revived existing resource reference");
        return Ok(id);
    }

    let (category, refused) = init_from_target(store, target)?;
    let id = ResourceId(store.next_id());
    store.persist_resource(ResourceEntity {
        id,
        owner,
        category,
        kind: ResourceKind::Ref(ResourceRefData {
            target,
            refused,
            residual: false,
        }),
    });
    debug!(reference = %id, %target, ?owner, "created resource reference");
    Ok(id)
}

/// The nodes one step below a resource's owner that must hold a reference
/// to it.
fn child_owners(store: &ColabStore, resource: ResourceId) -> Result<Vec<ResourceOwner>> {
    let owner = store.resource(resource)?.owner;
    let mut owners = Vec::new();
    match owner {
        ResourceOwner::CardType { card_type } => {
            owners.extend(
                store
                    .direct_type_refs(card_type)
                    .iter()
                    .map(|&reference| ResourceOwner::card_type(reference)),
            );
            owners.extend(
                store
                    .implementing_cards(card_type)
                    .iter()
                    .map(|&card| ResourceOwner::card(card)),
            );
        }
        ResourceOwner::Card { card } => {
            owners.extend(
                store
                    .variants_of(card)
                    .iter()
                    .map(|&content| ResourceOwner::content(content)),
            );
        }
        ResourceOwner::Content { content } => {
            if must_spread_reference(store, resource) {
                owners.extend(
                    store
                        .subcards_of(content)
                        .iter()
                        .map(|&card| ResourceOwner::card(card)),
                );
            }
        }
    }
    Ok(owners)
}

/// Create (or revive) the reference chain for this resource in every
/// descendant of its owner.
pub fn spread_reference_down(
    store: &mut ColabStore,
    _auth: SpreadAuthority,
    resource: ResourceId,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut worklist = vec![resource];
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        for owner in child_owners(store, current)? {
            let child = get_or_create_ref(store, current, owner)?;
            worklist.push(child);
        }
    }
    Ok(())
}

/// Seed a freshly created card-type reference with references to each of
/// its target's direct resources, then spread them further down.
pub fn extract_references_from_up(
    store: &mut ColabStore,
    auth: SpreadAuthority,
    type_ref: CardTypeId,
) -> Result<()> {
    let target = store.card_type(type_ref)?.target().ok_or_else(|| {
        ColabError::integrity(format!(
            "card type {type_ref} is concrete and has nothing to extract references from"
        ))
    })?;
    let sources: Vec<ResourceId> = store
        .resources_of(ResourceOwner::card_type(target))
        .to_vec();
    for source in sources {
        let child = get_or_create_ref(store, source, ResourceOwner::card_type(type_ref))?;
        spread_reference_down(store, auth, child)?;
    }
    Ok(())
}

/// A card newly placed under a parent content inherits the parent's direct
/// resources and its own card type's direct resources.
pub fn spread_resources_to_new_card(
    store: &mut ColabStore,
    auth: SpreadAuthority,
    card: CardId,
) -> Result<()> {
    let entity = store.card(card)?;
    let parent = entity.parent_content();
    let card_type = entity.card_type;

    let mut sources: Vec<ResourceId> = Vec::new();
    if let Some(parent) = parent {
        // The new card sits on the content -> sub-card edge, so the
        // spreading exclusion applies to the parent's resources.
        sources.extend(
            store
                .resources_of(ResourceOwner::content(parent))
                .to_vec()
                .into_iter()
                .filter(|&res| must_spread_reference(store, res)),
        );
    }
    if let Some(card_type) = card_type {
        sources.extend(store.resources_of(ResourceOwner::card_type(card_type)));
    }

    for source in sources {
        let child = get_or_create_ref(store, source, ResourceOwner::card(card))?;
        spread_reference_down(store, auth, child)?;
    }
    Ok(())
}

/// A card content newly created under a card inherits the card's direct
/// resources.
pub fn spread_resources_to_new_card_content(
    store: &mut ColabStore,
    auth: SpreadAuthority,
    content: CardContentId,
) -> Result<()> {
    let card = store.card_content(content)?.card;
    let sources: Vec<ResourceId> = store.resources_of(ResourceOwner::card(card)).to_vec();
    for source in sources {
        let child = get_or_create_ref(store, source, ResourceOwner::content(content))?;
        spread_reference_down(store, auth, child)?;
    }
    Ok(())
}

/// Re-create or revive the whole descendant chain of a resource that
/// became available again (published, restored owner path).
pub fn spread_available_resource_down(
    store: &mut ColabStore,
    auth: SpreadAuthority,
    resource: ResourceId,
) -> Result<()> {
    spread_reference_down(store, auth, resource)
}

/// Mark every descendant reference of a resource as residual because its
/// upstream path went away (unpublished, owner moved). With
/// `cascade_refusal` the references are refused as well.
pub fn spread_disable_resource_down(
    store: &mut ColabStore,
    _auth: SpreadAuthority,
    resource: ResourceId,
    cascade_refusal: bool,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut worklist: Vec<ResourceId> = store.direct_resource_refs(resource).to_vec();
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(data) = store.resource_mut(current)?.as_reference_mut() {
            data.residual = true;
            if cascade_refusal {
                data.refused = true;
            }
        }
        worklist.extend(store.direct_resource_refs(current).iter().copied());
    }
    debug!(%resource, disabled = seen.len(), "disabled descendant references");
    Ok(())
}

/// Refuse every transitive direct reference of a discarded resource.
pub fn refuse_descendants(
    store: &mut ColabStore,
    _auth: SpreadAuthority,
    resource: ResourceId,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut worklist: Vec<ResourceId> = store.direct_resource_refs(resource).to_vec();
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(data) = store.resource_mut(current)?.as_reference_mut() {
            data.refused = true;
        }
        worklist.extend(store.direct_resource_refs(current).iter().copied());
    }
    Ok(())
}

/// Reverse of [`refuse_descendants`]: un-refuse and revive residual
/// references after a restore.
pub fn revive_descendants(
    store: &mut ColabStore,
    _auth: SpreadAuthority,
    resource: ResourceId,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut worklist: Vec<ResourceId> = store.direct_resource_refs(resource).to_vec();
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(data) = store.resource_mut(current)?.as_reference_mut() {
            data.refused = false;
            data.residual = false;
        }
        worklist.extend(store.direct_resource_refs(current).iter().copied());
    }
    Ok(())
}

/// Remove a resource-or-reference together with its whole transitive
/// reference tree and, for a concrete resource, its attached documents.
pub fn delete_resource_tree(
    store: &mut ColabStore,
    _auth: SpreadAuthority,
    resource: ResourceId,
) -> Result<()> {
    let mut seen = HashSet::new();
    let mut worklist = vec![resource];
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        worklist.extend(store.direct_resource_refs(current).iter().copied());
    }
    for id in seen {
        let entity = store.remove_resource(id)?;
        if let Some(data) = entity.as_concrete() {
            if let Some(teaser) = data.teaser {
                store.remove_document(teaser);
            }
            for document in &data.documents {
                store.remove_document(*document);
            }
        }
    }
    Ok(())
}
