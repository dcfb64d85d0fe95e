//! Deletion-lifecycle collaborator.
//!
//! Owns the erasure-tracking fields of [`DeletionState`]. The lifecycle
//! manager decides *whether* a transition is acceptable; this module is
//! the only place that performs one.
//!
//! State machine: alive -> Bin -> ToDelete -> hard-deleted, with
//! Bin -> alive and ToDelete -> alive restore transitions.

use chrono::{DateTime, Utc};

use colab_api::{DeletionState, DeletionStatus};

pub fn put_in_bin(state: &mut DeletionState, now: DateTime<Utc>) {
    state.status = Some(DeletionStatus::Bin);
    state.erasure_requested_at = Some(now);
}

pub fn restore_from_bin(state: &mut DeletionState) {
    state.status = None;
    state.erasure_requested_at = None;
}

pub fn flag_as_to_delete_forever(state: &mut DeletionState, now: DateTime<Utc>) {
    state.status = Some(DeletionStatus::ToDelete);
    state.erasure_requested_at = Some(now);
}

pub fn is_alive(state: &DeletionState) -> bool {
    state.is_alive()
}

pub fn is_deleted(state: &DeletionState) -> bool {
    state.is_deleted()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bin_then_restore_round_trip() {
        let mut state = DeletionState::alive();
        assert!(is_alive(&state));

        let now = Utc::now();
        put_in_bin(&mut state, now);
        assert!(is_deleted(&state));
        assert_eq!(state.status, Some(DeletionStatus::Bin));
        assert_eq!(state.erasure_requested_at, Some(now));

        flag_as_to_delete_forever(&mut state, now);
        assert_eq!(state.status, Some(DeletionStatus::ToDelete));

        restore_from_bin(&mut state);
        assert!(is_alive(&state));
        assert_eq!(state.erasure_requested_at, None);
    }
}
