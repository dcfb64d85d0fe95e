//! Resource lifecycle operations.
//!
//! User-facing operations on concrete resources and their references;
//! every structural consequence is delegated to the spreading engine.

use tracing::info;

use colab_api::{
    ColabError, ResourceData, ResourceEntity, ResourceId, ResourceKind, ResourceOwner, Result,
};

use crate::engine::spreading;
use crate::security::{EntityRef, RequestContext};
use crate::store::ColabStore;

fn owner_entity_ref(owner: ResourceOwner) -> EntityRef {
    match owner {
        ResourceOwner::CardType { card_type } => EntityRef::CardType(card_type),
        ResourceOwner::Card { card } => EntityRef::Card(card),
        ResourceOwner::Content { content } => EntityRef::CardContent(content),
    }
}

fn assert_owner_exists(store: &ColabStore, owner: ResourceOwner) -> Result<()> {
    match owner {
        ResourceOwner::CardType { card_type } => store.card_type(card_type).map(|_| ()),
        ResourceOwner::Card { card } => store.card(card).map(|_| ()),
        ResourceOwner::Content { content } => store.card_content(content).map(|_| ()),
    }
}

/// Attach a new concrete resource to a card type, card or card content and
/// spread references for it into every descendant. A teaser text block is
/// seeded alongside.
pub fn create_resource(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    owner: ResourceOwner,
    title: Option<&str>,
    category: Option<&str>,
    teaser: &str,
) -> Result<ResourceId> {
    assert_owner_exists(store, owner)?;
    ctx.assert_can_update(owner_entity_ref(owner))?;

    let id = ResourceId(store.next_id());
    let teaser_doc = store.create_document(teaser);
    let mut entity = ResourceEntity::concrete(id, owner, title.map(String::from));
    entity.set_category(category);
    if let Some(data) = entity.as_concrete_mut() {
        data.teaser = Some(teaser_doc);
    }
    store.persist_resource(entity);

    spreading::spread_reference_down(store, ctx.spread_authority(), id)?;
    info!(resource = %id, ?owner, "created resource");
    Ok(id)
}

/// Publish a concrete resource, re-creating or reviving its descendant
/// reference chains.
pub fn publish_resource(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: ResourceId,
) -> Result<()> {
    ctx.assert_can_update(EntityRef::Resource(id))?;
    let data = concrete_mut(store, id)?;
    data.published = true;
    spreading::spread_available_resource_down(store, ctx.spread_authority(), id)?;
    info!(resource = %id, "published resource");
    Ok(())
}

/// Unpublish a concrete resource; descendant references become residual
/// but keep their refusal state so a later publish restores them as-is.
pub fn unpublish_resource(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: ResourceId,
) -> Result<()> {
    ctx.assert_can_update(EntityRef::Resource(id))?;
    let data = concrete_mut(store, id)?;
    data.published = false;
    spreading::spread_disable_resource_down(store, ctx.spread_authority(), id, false)?;
    info!(resource = %id, "unpublished resource");
    Ok(())
}

/// Discard a resource-or-reference: a concrete resource becomes deprecated
/// and every descendant reference is refused; a reference is refused
/// together with its own descendant chain.
pub fn discard_resource(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: ResourceId,
) -> Result<()> {
    ctx.assert_can_update(EntityRef::Resource(id))?;
    match &mut store.resource_mut(id)?.kind {
        ResourceKind::Concrete(data) => data.deprecated = true,
        ResourceKind::Ref(data) => data.refused = true,
    }
    spreading::refuse_descendants(store, ctx.spread_authority(), id)?;
    info!(resource = %id, "discarded resource");
    Ok(())
}

/// Reverse of [`discard_resource`]; also revives references previously
/// marked residual.
pub fn restore_resource(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: ResourceId,
) -> Result<()> {
    ctx.assert_can_update(EntityRef::Resource(id))?;
    match &mut store.resource_mut(id)?.kind {
        ResourceKind::Concrete(data) => data.deprecated = false,
        ResourceKind::Ref(data) => {
            data.refused = false;
            data.residual = false;
        }
    }
    spreading::revive_descendants(store, ctx.spread_authority(), id)?;
    info!(resource = %id, "restored resource");
    Ok(())
}

/// Flag the concrete resource behind a resource-or-reference as a
/// candidate for community highlighting. Unlike the read paths, this
/// needs the concrete terminus: a dangling chain blocks the operation.
pub fn request_resource_for_glory(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: ResourceId,
) -> Result<()> {
    store.resource(id)?;
    ctx.assert_can_update(EntityRef::Resource(id))?;
    let concrete = spreading::resolve(store, id)
        .ok_or_else(|| ColabError::unresolved("resource", id))?;
    concrete_mut(store, concrete)?.requesting_for_glory = true;
    info!(resource = %id, %concrete, "resource requested for glory");
    Ok(())
}

/// Hard-delete a resource-or-reference and its whole reference tree.
pub fn delete_resource(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    id: ResourceId,
) -> Result<()> {
    store.resource(id)?;
    ctx.assert_can_update(EntityRef::Resource(id))?;
    spreading::delete_resource_tree(store, ctx.spread_authority(), id)?;
    info!(resource = %id, "deleted resource");
    Ok(())
}

fn concrete_mut<'a>(store: &'a mut ColabStore, id: ResourceId) -> Result<&'a mut ResourceData> {
    store
        .resource_mut(id)?
        .as_concrete_mut()
        .ok_or_else(|| ColabError::integrity(format!("resource {id} is a reference")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lifecycle;
    use crate::security::OpenAccess;

    #[test]
    fn discard_and_restore_cycle_flips_descendant_refusal() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let card = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();

        let resource = create_resource(
            &mut store,
            &ctx,
            ResourceOwner::card(card),
            Some("notes"),
            None,
            "",
        )
        .unwrap();

        let content = store.variants_of(card)[0];
        let content_refs: Vec<ResourceId> =
            store.resources_of(ResourceOwner::content(content)).to_vec();
        assert_eq!(content_refs.len(), 1);

        discard_resource(&mut store, &ctx, resource).unwrap();
        assert!(store
            .resource(resource)
            .unwrap()
            .as_concrete()
            .unwrap()
            .deprecated);
        assert!(store
            .resource(content_refs[0])
            .unwrap()
            .as_reference()
            .unwrap()
            .refused);

        restore_resource(&mut store, &ctx, resource).unwrap();
        assert!(!store
            .resource(resource)
            .unwrap()
            .as_concrete()
            .unwrap()
            .deprecated);
        assert!(!store
            .resource(content_refs[0])
            .unwrap()
            .as_reference()
            .unwrap()
            .refused);
    }

    #[test]
    fn publish_unpublish_toggles_residual_state() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let card = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();

        let resource =
            create_resource(&mut store, &ctx, ResourceOwner::card(card), None, None, "").unwrap();
        let content = store.variants_of(card)[0];
        let reference = store.resources_of(ResourceOwner::content(content))[0];

        unpublish_resource(&mut store, &ctx, resource).unwrap();
        assert!(store
            .resource(reference)
            .unwrap()
            .as_reference()
            .unwrap()
            .residual);

        publish_resource(&mut store, &ctx, resource).unwrap();
        assert!(!store
            .resource(reference)
            .unwrap()
            .as_reference()
            .unwrap()
            .residual);
    }

    #[test]
    fn glory_request_through_a_reference_lands_on_the_concrete_resource() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let card = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();

        let resource =
            create_resource(&mut store, &ctx, ResourceOwner::card(card), None, None, "").unwrap();
        let content = store.variants_of(card)[0];
        let reference = store.resources_of(ResourceOwner::content(content))[0];

        request_resource_for_glory(&mut store, &ctx, reference).unwrap();
        assert!(
            store
                .resource(resource)
                .unwrap()
                .as_concrete()
                .unwrap()
                .requesting_for_glory,
            "the flag belongs to the concrete resource, not the reference"
        );
        assert!(store
            .resource(reference)
            .unwrap()
            .is_reference());
    }

    #[test]
    fn glory_request_on_a_dangling_chain_is_an_unresolved_chain_error() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let card = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();

        let dangling = ResourceId(store.next_id());
        store.persist_resource(ResourceEntity::reference(
            dangling,
            ResourceOwner::card(card),
            ResourceId(999),
        ));

        let err = request_resource_for_glory(&mut store, &ctx, dangling).unwrap_err();
        assert!(matches!(err, ColabError::UnresolvedChain { .. }));

        let err = request_resource_for_glory(&mut store, &ctx, ResourceId(999)).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn publish_of_a_reference_is_an_integrity_error() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let card = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();

        create_resource(&mut store, &ctx, ResourceOwner::card(card), None, None, "").unwrap();
        let content = store.variants_of(card)[0];
        let reference = store.resources_of(ResourceOwner::content(content))[0];

        let err = publish_resource(&mut store, &ctx, reference).unwrap_err();
        assert!(err.is_integrity());
    }
}
