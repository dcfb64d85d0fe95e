//! Background erasure sweep.
//!
//! Two passes run on a schedule owned by the embedding application:
//! entities sitting in the bin past the grace period move to to-delete,
//! and entities flagged to-delete past the grace period are erased for
//! good through the lifecycle manager. A failure on one entity is logged
//! and skipped so a single corrupt record cannot wedge the whole sweep.

use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use colab_api::{DeletionStatus, Result};

use crate::engine::lifecycle;
use crate::security::RequestContext;
use crate::store::ColabStore;

/// Outcome of one sweep pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    pub processed: usize,
    pub skipped: usize,
}

/// Promote bin entries older than the grace period to to-delete.
pub fn sweep_bin(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    now: DateTime<Utc>,
    grace: Duration,
) -> Result<SweepOutcome> {
    let cutoff = now - grace;
    let mut outcome = SweepOutcome::default();

    for card in store.cards_deleted_before(DeletionStatus::Bin, cutoff) {
        match lifecycle::mark_card_as_to_delete_forever(store, ctx, card) {
            Ok(()) => outcome.processed += 1,
            Err(err) => {
                warn!(%card, %err, "sweep: could not flag card for erasure, skipping");
                outcome.skipped += 1;
            }
        }
    }
    for content in store.contents_deleted_before(DeletionStatus::Bin, cutoff) {
        match lifecycle::mark_card_content_as_to_delete_forever(store, ctx, content) {
            Ok(()) => outcome.processed += 1,
            Err(err) => {
                warn!(%content, %err, "sweep: could not flag card content for erasure, skipping");
                outcome.skipped += 1;
            }
        }
    }
    info!(processed = outcome.processed, skipped = outcome.skipped, "bin sweep done");
    Ok(outcome)
}

/// Permanently erase to-delete entries older than the grace period.
///
/// Cards go first: erasing a card erases its whole subtree, so a flagged
/// content inside that subtree is simply gone by the time its own turn
/// comes, which counts as skipped, not failed.
pub fn sweep_to_delete(
    store: &mut ColabStore,
    ctx: &RequestContext<'_>,
    now: DateTime<Utc>,
    grace: Duration,
) -> Result<SweepOutcome> {
    let cutoff = now - grace;
    let mut outcome = SweepOutcome::default();

    // Snapshot both lists before erasing anything: erasing a card may take
    // flagged entities in its subtree with it.
    let cards = store.cards_deleted_before(DeletionStatus::ToDelete, cutoff);
    let contents = store.contents_deleted_before(DeletionStatus::ToDelete, cutoff);

    for card in cards {
        if store.find_card(card).is_none() {
            // Erased as part of an earlier card's subtree.
            outcome.skipped += 1;
            continue;
        }
        match lifecycle::delete_card(store, ctx, card) {
            Ok(()) => outcome.processed += 1,
            Err(err) => {
                warn!(%card, %err, "sweep: could not erase card, skipping");
                outcome.skipped += 1;
            }
        }
    }
    for content in contents {
        if store.find_card_content(content).is_none() {
            outcome.skipped += 1;
            continue;
        }
        match lifecycle::delete_card_content(store, ctx, content) {
            Ok(()) => outcome.processed += 1,
            Err(err) => {
                warn!(%content, %err, "sweep: could not erase card content, skipping");
                outcome.skipped += 1;
            }
        }
    }
    info!(processed = outcome.processed, skipped = outcome.skipped, "erasure sweep done");
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::lifecycle;
    use crate::security::OpenAccess;

    #[test]
    fn bin_sweep_respects_the_grace_period() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let card = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();
        lifecycle::put_card_in_bin(&mut store, &ctx, card).unwrap();

        let grace = Duration::days(30);

        // Too fresh: nothing moves.
        let outcome = sweep_bin(&mut store, &ctx, Utc::now(), grace).unwrap();
        assert_eq!(outcome, SweepOutcome::default());
        assert_eq!(
            store.card(card).unwrap().deletion.status,
            Some(DeletionStatus::Bin)
        );

        let later = Utc::now() + Duration::days(31);
        let outcome = sweep_bin(&mut store, &ctx, later, grace).unwrap();
        assert_eq!(outcome.processed, 1);
        assert_eq!(
            store.card(card).unwrap().deletion.status,
            Some(DeletionStatus::ToDelete)
        );
    }

    #[test]
    fn erasure_sweep_deletes_flagged_cards_and_tolerates_swept_subtrees() {
        let mut store = ColabStore::new();
        let gate = OpenAccess;
        let ctx = RequestContext::new(&gate);
        let project = lifecycle::create_project(&mut store, &ctx, "p").unwrap();
        let root_content = store.root_content_of(project).unwrap();
        let parent = lifecycle::create_new_card(&mut store, &ctx, root_content, None).unwrap();
        let parent_content = store.variants_of(parent)[0];
        let child = lifecycle::create_new_card(&mut store, &ctx, parent_content, None).unwrap();
        let child_content = store.variants_of(child)[0];
        let extra =
            lifecycle::create_new_card_content(&mut store, &ctx, child).unwrap();

        // Flag the parent card and a content inside its subtree.
        lifecycle::put_card_in_bin(&mut store, &ctx, parent).unwrap();
        lifecycle::mark_card_as_to_delete_forever(&mut store, &ctx, parent).unwrap();
        lifecycle::put_card_content_in_bin(&mut store, &ctx, extra).unwrap();
        lifecycle::mark_card_content_as_to_delete_forever(&mut store, &ctx, extra).unwrap();

        let later = Utc::now() + Duration::days(1);
        let outcome = sweep_to_delete(&mut store, &ctx, later, Duration::zero()).unwrap();
        assert_eq!(outcome.processed, 1, "one card erased");
        assert_eq!(outcome.skipped, 1, "content already gone with the subtree");

        assert!(store.find_card(parent).is_none());
        assert!(store.find_card(child).is_none());
        assert!(store.find_card_content(parent_content).is_none());
        assert!(store.find_card_content(child_content).is_none());
        assert!(store.find_card_content(extra).is_none());
    }
}
