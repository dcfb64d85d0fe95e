//! Card / card-content lifecycle manager.
//!
//! Orchestrates creation, soft deletion (bin), restoration, permanent
//! deletion, moves and retyping, calling into the grid, the card-type
//! resolver and the spreading engine so every structural invariant holds
//! after each operation. Every public operation is meant to run inside
//! one transaction boundary supplied by the surrounding persistence
//! collaborator: a precondition failure leaves no partial mutation.

use chrono::Utc;
use std::collections::HashSet;
use tracing::{error, info};

use colab_api::{
    Card, CardContent, CardContentId, CardId, CardParent, CardTypeEntity, CardTypeId, ColabError,
    DeletionStatus, Project, ProjectId, ResourceOwner, Result,
};

use crate::bin;
use crate::engine::{card_type, spreading};
use crate::grid::{Cell, Grid, DEFAULT_X_COORDINATE, DEFAULT_Y_COORDINATE};
use crate::security::{EntityRef, RequestContext, SpreadAuthority};
use crate::store::ColabStore;

// ---------------------------------------------------------------------
// Grid plumbing
// ---------------------------------------------------------------------

/// Cells for the alive sub-cards of one content, in stable creation order.
fn sibling_cells(store: &ColabStore, parent: CardContentId, exclude: Option<CardId>) -> Vec<Cell> {
    store
        .alive_subcards_of(parent)
        .into_iter()
        .filter(|&id| Some(id) != exclude)
        .filter_map(|id| store.find_card(id).map(Cell::from_card))
        .collect()
}

fn apply_grid(store: &mut ColabStore, grid: &Grid) -> Result<()> {
    for cell in grid.cells() {
        let card = store.card_mut(cell.card)?;
        card.x = cell.x;
        card.y = cell.y;
        card.width = cell.width;
        card.height = cell.height;
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------

/// Create a project with its root card and the root card's initial
/// content variant.
pub fn create_project(
    store: &mut ColabStore,
    _ctx: &RequestContext<'_>,
    name: impl Into<String>,
) -> Result<ProjectId> {
    let project = ProjectId(store.next_id());
    let root_card = CardId(store.next_id());
    let root_content = CardContentId(store.next_id());
    store.persist_card(Card::new(root_card, CardParent::Root { project }));
    store.persist_card_content(CardContent::new(root_content, root_card));
    store.persist_project(Project::new(project, name, root_card));
    info!(%project, %root_card, "created project");
    Ok(project)
}

/// Create a card under a parent content, with one content variant, placed
/// in the parent's grid. When a card type is given, the effective
/// type-or-reference for the parent's project is resolved or created and
/// the card's title is seeded from the resolved concrete type.
pub fn create_new_card(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    parent: CardContentId,
    requested_type: Option<CardTypeId>,
) -> Result<CardId> {
    store.card_content(parent)?;
    ctx.assert_can_update(EntityRef::CardContent(parent))?;
    let project = store.project_of_content(parent)?;

    let effective = match requested_type {
        Some(ty) => Some(card_type::compute_effective_card_type_or_ref(
            store, ctx, ty, project,
        )?),
        None => None,
    };

    let card_id = CardId(store.next_id());
    let mut card = Card::new(card_id, CardParent::Content { parent });
    card.card_type = effective;
    if let Some(ty) = effective {
        match card_type::resolve(store, ty) {
            Some(concrete) => {
                card.title = store
                    .card_type(concrete)?
                    .as_concrete()
                    .and_then(|data| data.title.clone());
            }
            // Tolerated: the chain may gain its terminus later.
            None => error!(card_type = %ty, card = %card_id,
                "card type does not resolve to a concrete type, creating card without title"),
        }
    }
    store.persist_card(card);

    let mut grid = Grid::resolve_conflicts(sibling_cells(store, parent, Some(card_id)));
    grid.add_cell(Cell::new(
        card_id,
        DEFAULT_X_COORDINATE,
        DEFAULT_Y_COORDINATE,
        1,
        1,
    ));
    grid.shift();
    apply_grid(store, &grid)?;

    let content = CardContentId(store.next_id());
    store.persist_card_content(CardContent::new(content, card_id));

    spreading::spread_resources_to_new_card(store, ctx.spread_authority(), card_id)?;
    info!(card = %card_id, %parent, card_type = ?effective, "created card");
    Ok(card_id)
}

/// Add a content variant to a card and spread the card's resources into
/// it.
pub fn create_new_card_content(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
) -> Result<CardContentId> {
    store.card(card)?;
    ctx.assert_can_update(EntityRef::Card(card))?;
    let content = CardContentId(store.next_id());
    store.persist_card_content(CardContent::new(content, card));
    spreading::spread_resources_to_new_card_content(store, ctx.spread_authority(), content)?;
    info!(%content, %card, "created card content");
    Ok(content)
}

// ---------------------------------------------------------------------
// Soft deletion and restore
// ---------------------------------------------------------------------

/// Move a card to the bin and compact the grid of its former siblings.
pub fn put_card_in_bin(store: &mut ColabStore, ctx: &RequestContext<'_>, card: CardId) -> Result<()> {
    let entity = store.card(card)?;
    if entity.is_root() {
        return Err(ColabError::integrity(format!(
            "card {card} is the root card of a project and cannot be deleted"
        )));
    }
    let parent = entity.parent_content();
    ctx.assert_can_update(EntityRef::Card(card))?;

    bin::put_in_bin(&mut store.card_mut(card)?.deletion, Utc::now());
    if let Some(parent) = parent {
        let mut grid = Grid::resolve_conflicts(sibling_cells(store, parent, None));
        grid.shift();
        apply_grid(store, &grid)?;
    }
    info!(%card, "card moved to bin");
    Ok(())
}

/// Move a content variant to the bin; the card must retain at least one
/// other alive variant.
pub fn put_card_content_in_bin(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    content: CardContentId,
) -> Result<()> {
    let card = store.card_content(content)?.card;
    if !store
        .alive_variants_of(card)
        .iter()
        .any(|&variant| variant != content)
    {
        return Err(ColabError::integrity(format!(
            "card content {content} is the only alive variant of card {card}"
        )));
    }
    ctx.assert_can_update(EntityRef::CardContent(content))?;
    bin::put_in_bin(&mut store.card_content_mut(content)?.deletion, Utc::now());
    info!(%content, "card content moved to bin");
    Ok(())
}

/// Restore a card from the bin (or from to-delete). When an ancestor card
/// is itself deleted, the card is adopted by the project's root content
/// instead of its original parent.
pub fn restore_card_from_bin(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
) -> Result<()> {
    let entity = store.card(card)?;
    if entity.deletion.is_alive() {
        return Err(ColabError::integrity(format!("card {card} is not deleted")));
    }
    let parent = entity.parent_content().ok_or_else(|| {
        ColabError::integrity(format!("card {card} is a root card and cannot be in the bin"))
    })?;
    ctx.assert_can_update(EntityRef::Card(card))?;

    bin::restore_from_bin(&mut store.card_mut(card)?.deletion);

    if store.is_any_ancestor_card_deleted(card)? {
        // Orphan adoption: the original parent chain is gone.
        let project = store.project_of_card(card)?;
        let root_content = store.root_content_of(project)?;
        store.reparent_card(card, root_content)?;
        {
            let entity = store.card_mut(card)?;
            entity.x = DEFAULT_X_COORDINATE;
            entity.y = DEFAULT_Y_COORDINATE;
        }
        let mut grid = Grid::resolve_conflicts(sibling_cells(store, root_content, Some(card)));
        grid.add_cell(Cell::from_card(store.card(card)?));
        grid.shift();
        apply_grid(store, &grid)?;
        spreading::spread_resources_to_new_card(store, ctx.spread_authority(), card)?;
        info!(%card, %root_content, "restored card, adopted by root content");
    } else {
        let mut grid = Grid::resolve_conflicts(sibling_cells(store, parent, Some(card)));
        // May silently relocate the card when its saved slot is occupied.
        grid.add_cell(Cell::from_card(store.card(card)?));
        grid.shift();
        apply_grid(store, &grid)?;
        info!(%card, %parent, "restored card from bin");
    }
    Ok(())
}

pub fn restore_card_content_from_bin(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    content: CardContentId,
) -> Result<()> {
    let entity = store.card_content(content)?;
    if entity.deletion.is_alive() {
        return Err(ColabError::integrity(format!(
            "card content {content} is not deleted"
        )));
    }
    ctx.assert_can_update(EntityRef::CardContent(content))?;
    bin::restore_from_bin(&mut store.card_content_mut(content)?.deletion);
    info!(%content, "restored card content from bin");
    Ok(())
}

/// Bin -> to-delete transition, no structural side effects.
pub fn mark_card_as_to_delete_forever(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
) -> Result<()> {
    if store.card(card)?.deletion.status != Some(DeletionStatus::Bin) {
        return Err(ColabError::integrity(format!("card {card} is not in the bin")));
    }
    ctx.assert_can_update(EntityRef::Card(card))?;
    bin::flag_as_to_delete_forever(&mut store.card_mut(card)?.deletion, Utc::now());
    Ok(())
}

pub fn mark_card_content_as_to_delete_forever(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    content: CardContentId,
) -> Result<()> {
    if store.card_content(content)?.deletion.status != Some(DeletionStatus::Bin) {
        return Err(ColabError::integrity(format!(
            "card content {content} is not in the bin"
        )));
    }
    ctx.assert_can_update(EntityRef::CardContent(content))?;
    bin::flag_as_to_delete_forever(&mut store.card_content_mut(content)?.deletion, Utc::now());
    Ok(())
}

// ---------------------------------------------------------------------
// Hard deletion
// ---------------------------------------------------------------------

/// Permanently delete a card and its whole subtree: contents, sub-cards,
/// owned resources with their reference trees, and deliverable documents.
/// The root card of a project can never be deleted.
pub fn delete_card(store: &mut ColabStore, ctx: &RequestContext<'_>, card: CardId) -> Result<()> {
    let entity = store.card(card)?;
    if entity.is_root() {
        return Err(ColabError::integrity(format!(
            "card {card} is the root card of a project and cannot be deleted"
        )));
    }
    let parent = entity.parent_content();
    ctx.assert_can_update(EntityRef::Card(card))?;
    delete_card_tree(store, ctx.spread_authority(), card)?;

    // Compact the sibling grid around the freed slot.
    if let Some(parent) = parent {
        if store.find_card_content(parent).is_some() {
            let mut grid = Grid::resolve_conflicts(sibling_cells(store, parent, None));
            grid.shift();
            apply_grid(store, &grid)?;
        }
    }
    info!(%card, "deleted card");
    Ok(())
}

/// Permanently delete a content variant and its subtree; the card must
/// retain at least one other alive variant.
pub fn delete_card_content(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    content: CardContentId,
) -> Result<()> {
    let card = store.card_content(content)?.card;
    if !store
        .alive_variants_of(card)
        .iter()
        .any(|&variant| variant != content)
    {
        return Err(ColabError::integrity(format!(
            "card content {content} is the only alive variant of card {card}"
        )));
    }
    ctx.assert_can_update(EntityRef::CardContent(content))?;

    let auth = ctx.spread_authority();
    for sub in store.subcards_of(content).to_vec() {
        delete_card_tree(store, auth, sub)?;
    }
    for resource in store.resources_of(ResourceOwner::content(content)).to_vec() {
        spreading::delete_resource_tree(store, auth, resource)?;
    }
    let removed = store.remove_card_content(content)?;
    for document in removed.deliverables {
        store.remove_document(document);
    }
    info!(%content, "deleted card content");
    Ok(())
}

fn delete_card_tree(store: &mut ColabStore, auth: SpreadAuthority, root: CardId) -> Result<()> {
    // Collect the whole subtree first; the worklist tolerates accidental
    // cycles in corrupt data.
    let mut cards = Vec::new();
    let mut contents = Vec::new();
    let mut seen = HashSet::new();
    let mut worklist = vec![root];
    while let Some(current) = worklist.pop() {
        if !seen.insert(current) {
            continue;
        }
        cards.push(current);
        for &variant in store.variants_of(current) {
            contents.push(variant);
            worklist.extend(store.subcards_of(variant).iter().copied());
        }
    }

    for &card in &cards {
        for resource in store.resources_of(ResourceOwner::card(card)).to_vec() {
            spreading::delete_resource_tree(store, auth, resource)?;
        }
    }
    for &content in &contents {
        for resource in store.resources_of(ResourceOwner::content(content)).to_vec() {
            spreading::delete_resource_tree(store, auth, resource)?;
        }
    }
    for content in contents {
        let removed = store.remove_card_content(content)?;
        for document in removed.deliverables {
            store.remove_document(document);
        }
    }
    for card in cards {
        store.remove_card(card)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------
// Moves
// ---------------------------------------------------------------------

/// Move a card under another content. Rejected when the destination is
/// the card itself or any of its own descendants; the ancestor walk runs
/// before anything is mutated. References sourced from the old parent
/// become residual; references are spread fresh from the new parent.
pub fn move_card(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
    new_parent: CardContentId,
) -> Result<()> {
    let entity = store.card(card)?;
    if entity.is_root() {
        return Err(ColabError::integrity(format!(
            "card {card} is the root card of a project and cannot move"
        )));
    }
    let old_parent = entity.parent_content().ok_or_else(|| {
        ColabError::integrity(format!("card {card} has no parent card content"))
    })?;
    store.card_content(new_parent)?;
    if old_parent == new_parent {
        return Ok(());
    }

    // Walk up from the destination: meeting the moved card means the
    // destination is inside its own subtree.
    let mut seen = HashSet::new();
    let mut cursor = new_parent;
    loop {
        let owner = store.card_content(cursor)?.card;
        if owner == card {
            return Err(ColabError::integrity(format!(
                "cannot move card {card} into its own descendant content {new_parent}"
            )));
        }
        if !seen.insert(owner) {
            return Err(ColabError::integrity(format!(
                "card hierarchy above content {new_parent} contains a cycle"
            )));
        }
        match store.card(owner)?.parent {
            CardParent::Root { .. } => break,
            CardParent::Content { parent } => cursor = parent,
        }
    }
    ctx.assert_can_update(EntityRef::Card(card))?;

    let auth = ctx.spread_authority();

    // References fed by the old parent content lose their source path.
    let old_sourced: Vec<_> = store
        .resources_of(ResourceOwner::card(card))
        .iter()
        .copied()
        .filter(|&reference| {
            store
                .find_resource(reference)
                .and_then(|entity| entity.target())
                .and_then(|target| store.find_resource(target))
                .is_some_and(|target| target.owner == ResourceOwner::content(old_parent))
        })
        .collect();
    for reference in old_sourced {
        if let Some(data) = store.resource_mut(reference)?.as_reference_mut() {
            data.residual = true;
        }
        spreading::spread_disable_resource_down(store, auth, reference, false)?;
    }

    store.reparent_card(card, new_parent)?;
    {
        let entity = store.card_mut(card)?;
        entity.x = DEFAULT_X_COORDINATE;
        entity.y = DEFAULT_Y_COORDINATE;
    }
    let mut grid = Grid::resolve_conflicts(sibling_cells(store, new_parent, Some(card)));
    grid.add_cell(Cell::from_card(store.card(card)?));
    grid.shift();
    apply_grid(store, &grid)?;

    // Old-sibling grid compacts around the hole the card left.
    let mut old_grid = Grid::resolve_conflicts(sibling_cells(store, old_parent, None));
    old_grid.shift();
    apply_grid(store, &old_grid)?;

    spreading::spread_resources_to_new_card(store, auth, card)?;
    info!(%card, from = %old_parent, to = %new_parent, "moved card");
    Ok(())
}

/// Move a card one level up, under its grandparent content. Fails with a
/// data-integrity error when any level of the chain is missing.
pub fn move_card_above(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
) -> Result<()> {
    let parent = store.card(card)?.parent_content().ok_or_else(|| {
        ColabError::integrity(format!(
            "card {card} is the root card of a project and cannot move"
        ))
    })?;
    let parent_card = store.card_content(parent)?.card;
    let grandparent = store.card(parent_card)?.parent_content().ok_or_else(|| {
        ColabError::integrity(format!("card {card} has no grandparent card content"))
    })?;
    move_card(store, ctx, card, grandparent)
}

/// Apply a requested rectangle to one card, resolving any collision by
/// relocating the card, then re-anchoring the sibling grid.
pub fn change_card_position(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
) -> Result<()> {
    let parent = store.card(card)?.parent_content().ok_or_else(|| {
        ColabError::integrity(format!("card {card} is a root card and has no sibling grid"))
    })?;
    ctx.assert_can_update(EntityRef::Card(card))?;

    let mut grid = Grid::resolve_conflicts(sibling_cells(store, parent, Some(card)));
    grid.add_cell(Cell::new(card, x, y, width, height));
    grid.shift();
    apply_grid(store, &grid)?;
    Ok(())
}

// ---------------------------------------------------------------------
// Card type attach / detach
// ---------------------------------------------------------------------

/// Create a fresh concrete card type for a card that has none, owned by
/// the card's project and seeded with the card's title and an empty
/// purpose block.
pub fn create_card_type_for_card(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
) -> Result<CardTypeId> {
    let entity = store.card(card)?;
    if entity.card_type.is_some() {
        return Err(ColabError::integrity(format!(
            "card {card} already has a card type"
        )));
    }
    let title = entity.title.clone();
    ctx.assert_can_update(EntityRef::Card(card))?;

    let project = store.project_of_card(card)?;
    let id = CardTypeId(store.next_id());
    let purpose = store.create_document("");
    let mut card_type = CardTypeEntity::concrete(id, Some(project), title);
    if let Some(data) = card_type.as_concrete_mut() {
        data.purpose = Some(purpose);
    }
    store.persist_card_type(card_type);
    store.set_card_type(card, Some(id))?;
    info!(%card, card_type = %id, "created card type for card");
    Ok(id)
}

/// Detach a card's type. Only permitted while the type has no directly
/// attached resources; a conservative simplification, not a general
/// constraint.
pub fn remove_card_type_from_card(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    card: CardId,
) -> Result<()> {
    let card_type = store
        .card(card)?
        .card_type
        .ok_or_else(|| ColabError::integrity(format!("card {card} has no card type")))?;
    if !store
        .resources_of(ResourceOwner::card_type(card_type))
        .is_empty()
    {
        return Err(ColabError::integrity(format!(
            "card type {card_type} still has resources attached"
        )));
    }
    ctx.assert_can_update(EntityRef::Card(card))?;
    store.set_card_type(card, None)?;
    info!(%card, %card_type, "removed card type from card");
    Ok(())
}
