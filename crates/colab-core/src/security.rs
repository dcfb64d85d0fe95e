//! Permission checkpoint seam.
//!
//! The engine never evaluates access-control policy itself; it calls the
//! gate before mutating on behalf of a user-facing request. Cascading
//! reference maintenance runs under an explicit [`SpreadAuthority`]
//! capability minted by the request context, threaded through the
//! spreading functions as a parameter instead of any ambient elevation.

use colab_api::{CardContentId, CardId, CardTypeId, ProjectId, ResourceId, Result};

/// Identifies the entity a permission check is about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntityRef {
    Project(ProjectId),
    Card(CardId),
    CardContent(CardContentId),
    CardType(CardTypeId),
    Resource(ResourceId),
}

/// Access-control checkpoint implemented by the surrounding application.
pub trait PermissionGate {
    /// Fails when the current principal may not update the entity.
    fn assert_can_update(&self, entity: EntityRef) -> Result<()>;
}

/// Gate that allows everything; used by tests and trusted batch callers.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenAccess;

impl PermissionGate for OpenAccess {
    fn assert_can_update(&self, _entity: EntityRef) -> Result<()> {
        Ok(())
    }
}

/// Capability to run cascading reference maintenance.
///
/// Only obtainable through [`RequestContext::spread_authority`], after the
/// triggering operation has passed its own permission check.
#[derive(Clone, Copy, Debug)]
pub struct SpreadAuthority {
    _private: (),
}

/// Per-request bundle of collaborator handles.
pub struct RequestContext<'a> {
    gate: &'a dyn PermissionGate,
}

impl<'a> RequestContext<'a> {
    pub fn new(gate: &'a dyn PermissionGate) -> Self {
        Self { gate }
    }

    pub fn assert_can_update(&self, entity: EntityRef) -> Result<()> {
        self.gate.assert_can_update(entity)
    }

    /// Mint the capability for cascading reference maintenance.
    pub fn spread_authority(&self) -> SpreadAuthority {
        SpreadAuthority { _private: () }
    }
}
