//! End-to-end scenarios driving the lifecycle manager, the grid and the
//! spreading engine together through the public engine API.

use anyhow::Result;

use colab_api::{CardParent, ResourceOwner};
use colab_core::engine::{card_type, lifecycle, resources};
use colab_core::testing::Bench;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn create_place_and_move_scenario() -> Result<()> {
    init_tracing();
    let mut bench = Bench::new();
    let c0 = bench.root_content;

    let a = bench.run(|store, ctx| lifecycle::create_new_card(store, ctx, c0, None))?;
    {
        let card = bench.store.card(a)?;
        assert_eq!(card.parent, CardParent::Content { parent: c0 });
        assert_eq!((card.x, card.y), (1, 1));
    }

    let b = bench.run(|store, ctx| lifecycle::create_new_card(store, ctx, c0, None))?;
    {
        let card_a = bench.store.card(a)?;
        let card_b = bench.store.card(b)?;
        assert_eq!((card_b.x, card_b.y), (1, 2), "next free cell below A");
        let ra = (card_a.x, card_a.y, card_a.width, card_a.height);
        let rb = (card_b.x, card_b.y, card_b.width, card_b.height);
        assert!(
            ra.0 + ra.2 <= rb.0 || rb.0 + rb.2 <= ra.0 || ra.1 + ra.3 <= rb.1 || rb.1 + rb.3 <= ra.1,
            "siblings must not overlap"
        );
    }

    let b_content = bench.content_of(b);
    bench.run(|store, ctx| lifecycle::move_card(store, ctx, a, b_content))?;

    assert_eq!(
        bench.store.card(a)?.parent,
        CardParent::Content { parent: b_content }
    );
    assert_eq!((bench.store.card(a)?.x, bench.store.card(a)?.y), (1, 1));
    assert_eq!(bench.store.subcards_of(c0), &[b]);
    Ok(())
}

#[test]
fn move_into_own_descendant_is_rejected_and_leaves_tree_unchanged() -> Result<()> {
    let mut bench = Bench::new();
    let parent = bench.card();
    let parent_content = bench.content_of(parent);
    let child = bench.card_under(parent_content);
    let grandchild_content = bench.content_of(child);

    let cards_before: Vec<_> = [parent, child]
        .iter()
        .map(|&id| bench.store.card(id).cloned())
        .collect::<std::result::Result<_, _>>()?;

    let err = bench
        .run(|store, ctx| lifecycle::move_card(store, ctx, parent, grandchild_content))
        .unwrap_err();
    assert!(err.is_integrity());

    for before in cards_before {
        assert_eq!(bench.store.card(before.id)?, &before, "tree must be unchanged");
    }
    Ok(())
}

#[test]
fn root_card_can_never_be_deleted_or_moved() -> Result<()> {
    let mut bench = Bench::new();
    let root = bench.store.project(bench.project)?.root_card;
    let other = bench.card();
    let other_content = bench.content_of(other);

    let err = bench
        .run(|store, ctx| lifecycle::put_card_in_bin(store, ctx, root))
        .unwrap_err();
    assert!(err.is_integrity());

    let err = bench
        .run(|store, ctx| lifecycle::delete_card(store, ctx, root))
        .unwrap_err();
    assert!(err.is_integrity());

    let err = bench
        .run(|store, ctx| lifecycle::move_card(store, ctx, root, other_content))
        .unwrap_err();
    assert!(err.is_integrity());

    assert!(bench.store.card(root)?.is_root());
    Ok(())
}

#[test]
fn last_alive_variant_cannot_be_binned_or_deleted() -> Result<()> {
    let mut bench = Bench::new();
    let card = bench.card();
    let only = bench.content_of(card);

    let err = bench
        .run(|store, ctx| lifecycle::put_card_content_in_bin(store, ctx, only))
        .unwrap_err();
    assert!(err.is_integrity());

    let second = bench.run(|store, ctx| lifecycle::create_new_card_content(store, ctx, card))?;
    bench.run(|store, ctx| lifecycle::put_card_content_in_bin(store, ctx, only))?;
    assert_eq!(bench.store.alive_variants_of(card), vec![second]);

    // The surviving variant is now the last alive one.
    let err = bench
        .run(|store, ctx| lifecycle::delete_card_content(store, ctx, second))
        .unwrap_err();
    assert!(err.is_integrity());
    Ok(())
}

#[test]
fn restoring_a_card_under_a_deleted_ancestor_adopts_it_to_the_root() -> Result<()> {
    let mut bench = Bench::new();
    let parent = bench.card();
    let parent_content = bench.content_of(parent);
    let child = bench.card_under(parent_content);

    bench.run(|store, ctx| lifecycle::put_card_in_bin(store, ctx, child))?;
    bench.run(|store, ctx| lifecycle::put_card_in_bin(store, ctx, parent))?;
    bench.run(|store, ctx| lifecycle::restore_card_from_bin(store, ctx, child))?;

    let root_content = bench.root_content;
    assert_eq!(
        bench.store.card(child)?.parent,
        CardParent::Content { parent: root_content },
        "child must be adopted by the root content while its parent stays binned"
    );
    assert!(bench.store.card(child)?.deletion.is_alive());
    assert!(bench.store.card(parent)?.deletion.is_deleted());
    Ok(())
}

#[test]
fn moving_a_card_marks_parent_sourced_references_residual() -> Result<()> {
    let mut bench = Bench::new();
    let project = bench.project;
    let c0 = bench.root_content;

    // A type-owned resource spreads through card A down to its sub-card.
    let ty =
        bench.run(|store, ctx| card_type::create_card_type(store, ctx, project, Some("task")))?;
    bench.run(|store, ctx| {
        resources::create_resource(
            store,
            ctx,
            ResourceOwner::card_type(ty),
            Some("guide"),
            None,
            "",
        )
    })?;
    let a = bench.run(|store, ctx| lifecycle::create_new_card(store, ctx, c0, Some(ty)))?;
    let a_content = bench.content_of(a);
    let child = bench.card_under(a_content);
    let b = bench.card();
    let b_content = bench.content_of(b);

    let child_refs = bench.store.resources_of(ResourceOwner::card(child)).to_vec();
    assert_eq!(child_refs.len(), 1, "child inherits the ref through A's content");

    bench.run(|store, ctx| lifecycle::move_card(store, ctx, child, b_content))?;

    let reference = bench.store.resource(child_refs[0])?;
    assert!(
        reference.as_reference().is_some_and(|data| data.residual),
        "reference sourced from the old parent must become residual"
    );
    assert_eq!(
        bench.store.card(child)?.parent,
        CardParent::Content { parent: b_content }
    );
    Ok(())
}

#[test]
fn typed_card_creation_reuses_the_project_reference_and_seeds_the_title() -> Result<()> {
    use colab_api::{CardTypeEntity, CardTypeId};

    let mut bench = Bench::new();

    // A concrete type owned by no project plays the shared-library role.
    let ty = CardTypeId(bench.store.next_id());
    bench
        .store
        .persist_card_type(CardTypeEntity::concrete(ty, None, Some("task".to_string())));

    let c0 = bench.root_content;
    let first = bench.run(|store, ctx| lifecycle::create_new_card(store, ctx, c0, Some(ty)))?;
    let second = bench.run(|store, ctx| lifecycle::create_new_card(store, ctx, c0, Some(ty)))?;

    let first_ty = bench.store.card(first)?.card_type.unwrap();
    let second_ty = bench.store.card(second)?.card_type.unwrap();
    assert_eq!(first_ty, second_ty, "one reference per (project, target)");
    assert_ne!(first_ty, ty, "a foreign type is used through a reference");
    assert_eq!(bench.store.card(first)?.title.as_deref(), Some("task"));
    Ok(())
}

#[test]
fn move_card_above_lands_under_the_grandparent_content() -> Result<()> {
    let mut bench = Bench::new();
    let a = bench.card();
    let a_content = bench.content_of(a);
    let child = bench.card_under(a_content);

    bench.run(|store, ctx| lifecycle::move_card_above(store, ctx, child))?;
    let root_content = bench.root_content;
    assert_eq!(
        bench.store.card(child)?.parent,
        CardParent::Content { parent: root_content }
    );

    // A card directly under the root content has no grandparent to move to.
    let err = bench
        .run(|store, ctx| lifecycle::move_card_above(store, ctx, child))
        .unwrap_err();
    assert!(err.is_integrity());
    Ok(())
}

#[test]
fn change_card_position_honors_free_slots_and_relocates_on_clash() -> Result<()> {
    let mut bench = Bench::new();
    let first = bench.card();
    let second = bench.card();
    assert_eq!(
        (bench.store.card(second)?.x, bench.store.card(second)?.y),
        (1, 2)
    );

    // A free rectangle is taken as requested.
    bench.run(|store, ctx| lifecycle::change_card_position(store, ctx, second, 3, 1, 1, 1))?;
    assert_eq!(
        (bench.store.card(second)?.x, bench.store.card(second)?.y),
        (3, 1)
    );

    // Requesting the first card's slot relocates instead of overlapping.
    bench.run(|store, ctx| lifecycle::change_card_position(store, ctx, second, 1, 1, 1, 1))?;
    let first_cell = bench.store.card(first)?;
    let second_cell = bench.store.card(second)?;
    assert_eq!((first_cell.x, first_cell.y), (1, 1));
    assert_ne!(
        (second_cell.x, second_cell.y),
        (first_cell.x, first_cell.y),
        "clashing request must be relocated"
    );
    Ok(())
}

#[test]
fn card_type_attach_and_detach_acceptability() -> Result<()> {
    let mut bench = Bench::new();
    let card = bench.card();

    let ty = bench.run(|store, ctx| lifecycle::create_card_type_for_card(store, ctx, card))?;
    assert_eq!(bench.store.card(card)?.card_type, Some(ty));
    assert_eq!(bench.store.card_type(ty)?.project, Some(bench.project));

    // A second attach on an already-typed card is rejected.
    let err = bench
        .run(|store, ctx| lifecycle::create_card_type_for_card(store, ctx, card))
        .unwrap_err();
    assert!(err.is_integrity());

    // Detach is blocked while the type holds a direct resource.
    let resource = bench.run(|store, ctx| {
        resources::create_resource(store, ctx, ResourceOwner::card_type(ty), None, None, "")
    })?;
    let err = bench
        .run(|store, ctx| lifecycle::remove_card_type_from_card(store, ctx, card))
        .unwrap_err();
    assert!(err.is_integrity());

    bench.run(|store, ctx| resources::delete_resource(store, ctx, resource))?;
    bench.run(|store, ctx| lifecycle::remove_card_type_from_card(store, ctx, card))?;
    assert_eq!(bench.store.card(card)?.card_type, None);
    Ok(())
}

#[test]
fn project_owned_card_type_gets_a_purpose_block() -> Result<()> {
    let mut bench = Bench::new();
    let project = bench.project;
    let ty =
        bench.run(|store, ctx| card_type::create_card_type(store, ctx, project, Some("note")))?;

    let entity = bench.store.card_type(ty)?;
    assert_eq!(entity.project, Some(project));
    let purpose = entity.as_concrete().and_then(|data| data.purpose).unwrap();
    assert!(bench.store.document(purpose).is_ok());
    Ok(())
}
