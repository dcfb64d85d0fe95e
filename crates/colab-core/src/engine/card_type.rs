//! Card-type reference resolution.
//!
//! Types can be referenced across projects through chains of references
//! (ref -> ref -> concrete type). This module resolves and expands those
//! chains, maintains the one-reference-per-(project, target) invariant,
//! and answers the transitive-closure queries the access-control layer
//! depends on.
//!
//! All traversals are iterative with explicit seen-sets: a cyclic chain is
//! corrupt data, but it must surface as "unresolved", never as a hang.

use std::collections::HashSet;
use tracing::{debug, info};

use colab_api::{CardTypeEntity, CardTypeId, ColabError, ProjectId, ResourceOwner, Result};

use crate::engine::spreading;
use crate::security::{EntityRef, RequestContext};
use crate::store::ColabStore;

/// Follow the target chain down to the concrete type.
///
/// Returns `None` on a dangling target or a cycle; callers must treat that
/// as a legitimate "unresolved" state, not an error.
pub fn resolve(store: &ColabStore, id: CardTypeId) -> Option<CardTypeId> {
    let mut seen = HashSet::new();
    let mut current = id;
    loop {
        if !seen.insert(current) {
            return None;
        }
        match store.find_card_type(current)?.target() {
            None => return Some(current),
            Some(target) => current = target,
        }
    }
}

/// The full provenance chain `[id, target, target.target, ..., concrete]`.
///
/// A broken chain yields the prefix that exists.
pub fn expand(store: &ColabStore, id: CardTypeId) -> Vec<CardTypeId> {
    let mut chain = Vec::new();
    let mut seen = HashSet::new();
    let mut current = id;
    loop {
        if !seen.insert(current) {
            return chain;
        }
        let Some(entity) = store.find_card_type(current) else {
            return chain;
        };
        chain.push(current);
        match entity.target() {
            None => return chain,
            Some(target) => current = target,
        }
    }
}

/// True iff `child` is a reference whose chain passes through `ancestor`.
pub fn is_transitive_ref(store: &ColabStore, child: CardTypeId, ancestor: CardTypeId) -> bool {
    let is_ref = store
        .find_card_type(child)
        .is_some_and(CardTypeEntity::is_reference);
    is_ref && expand(store, child).iter().skip(1).any(|&id| id == ancestor)
}

/// Create a fresh concrete card type owned by a project, with an empty
/// purpose block ready for editing.
pub fn create_card_type(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    project: ProjectId,
    title: Option<&str>,
) -> Result<CardTypeId> {
    store.project(project)?;
    ctx.assert_can_update(EntityRef::Project(project))?;

    let id = CardTypeId(store.next_id());
    let purpose = store.create_document("");
    let mut entity = CardTypeEntity::concrete(id, Some(project), title.map(String::from));
    if let Some(data) = entity.as_concrete_mut() {
        data.purpose = Some(purpose);
    }
    store.persist_card_type(entity);
    info!(card_type = %id, %project, "created card type");
    Ok(id)
}

/// The type-or-reference a project should use for the given type.
///
/// Returns the type itself when it is already local to the project, an
/// existing direct reference when the project already has one (no
/// duplication), and otherwise creates a new reference owned by the
/// project and seeds its resource references.
pub fn compute_effective_card_type_or_ref(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card_type: CardTypeId,
    project: ProjectId,
) -> Result<CardTypeId> {
    let owning_project = store.card_type(card_type)?.project;
    if owning_project == Some(project) {
        return Ok(card_type);
    }

    let existing = store
        .types_of_project(project)
        .iter()
        .copied()
        .find(|&candidate| {
            store
                .find_card_type(candidate)
                .and_then(CardTypeEntity::target)
                == Some(card_type)
        });
    if let Some(reference) = existing {
        debug!(%card_type, %project, %reference, "reusing existing card type reference");
        return Ok(reference);
    }

    create_reference(store, ctx, card_type, project)
}

fn create_reference(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    target: CardTypeId,
    project: ProjectId,
) -> Result<CardTypeId> {
    // Should be unreachable through compute_effective_card_type_or_ref.
    if store.card_type(target)?.project == Some(project) {
        return Err(ColabError::integrity(format!(
            "cannot create a reference to card type {target} inside its own project {project}"
        )));
    }

    let id = CardTypeId(store.next_id());
    store.persist_card_type(CardTypeEntity::reference(id, Some(project), target));
    spreading::extract_references_from_up(store, ctx.spread_authority(), id)?;
    info!(reference = %id, %target, %project, "created card type reference");
    Ok(id)
}

/// A type-or-reference may be deleted only while nothing depends on it:
/// no implementing card and no direct reference pointing at it.
pub fn check_deletion_acceptability(store: &ColabStore, id: CardTypeId) -> Result<()> {
    store.card_type(id)?;
    if !store.implementing_cards(id).is_empty() {
        return Err(ColabError::integrity(format!(
            "card type {id} is still used by cards"
        )));
    }
    if !store.direct_type_refs(id).is_empty() {
        return Err(ColabError::integrity(format!(
            "card type {id} is still referenced by other projects"
        )));
    }
    Ok(())
}

/// Hard-delete a type-or-reference, its directly-owned resources and its
/// purpose block. Fails when [`check_deletion_acceptability`] does.
pub fn delete_card_type(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: CardTypeId,
) -> Result<()> {
    check_deletion_acceptability(store, id)?;
    ctx.assert_can_update(EntityRef::CardType(id))?;

    let owned: Vec<_> = store.resources_of(ResourceOwner::card_type(id)).to_vec();
    for resource in owned {
        spreading::delete_resource_tree(store, ctx.spread_authority(), resource)?;
    }

    let entity = store.remove_card_type(id)?;
    if let Some(purpose) = entity.as_concrete().and_then(|data| data.purpose) {
        store.remove_document(purpose);
    }
    info!(card_type = %id, "deleted card type");
    Ok(())
}

/// Transitive closure of type ids reachable from the seed set, expanding
/// both "above" (direct targets) and "below" (direct references) until
/// fixpoint. Terminates on accidental cycles thanks to the seen-set.
pub fn reachable_card_type_ids(store: &ColabStore, seeds: &[CardTypeId]) -> HashSet<CardTypeId> {
    let mut seen: HashSet<CardTypeId> = HashSet::new();
    let mut worklist: Vec<CardTypeId> = seeds.to_vec();
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        if let Some(entity) = store.find_card_type(current) {
            if let Some(target) = entity.target() {
                worklist.push(target);
            }
        }
        worklist.extend(store.direct_type_refs(current).iter().copied());
    }
    seen
}
