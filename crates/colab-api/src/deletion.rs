//! Soft-deletion lifecycle state.
//!
//! An entity is alive while `status` is `None`. The bin collaborator in
//! `colab-core` is the only code that transitions this state; everything
//! else just reads it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a soft-deleted entity sits in the deletion pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeletionStatus {
    /// In the bin, restorable by a user.
    Bin,
    /// Flagged for permanent deletion, restorable until the sweep runs.
    ToDelete,
}

/// Deletion status plus the erasure-tracking timestamp owned by the bin
/// collaborator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletionState {
    pub status: Option<DeletionStatus>,
    /// When the current status was requested; cleared on restore.
    pub erasure_requested_at: Option<DateTime<Utc>>,
}

impl DeletionState {
    pub fn alive() -> Self {
        Self::default()
    }

    pub fn is_alive(&self) -> bool {
        self.status.is_none()
    }

    pub fn is_deleted(&self) -> bool {
        self.status.is_some()
    }
}
