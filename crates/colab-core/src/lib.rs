//! Core engines of the coLAB card hierarchy.
//!
//! - `grid`: layout algebra for sibling cards inside one card content
//! - `store`: in-memory entity arena with derived relationship indices
//! - `security`: permission gate seam and the spread-authority capability
//! - `bin`: deletion-state transitions (alive / bin / to-delete)
//! - `engine`: card-type resolution, resource spreading, lifecycle, sweep

pub mod bin;
pub mod engine;
pub mod grid;
pub mod security;
pub mod store;
pub mod testing;

pub use grid::{Cell, Grid};
pub use security::{EntityRef, OpenAccess, PermissionGate, RequestContext, SpreadAuthority};
pub use store::ColabStore;
