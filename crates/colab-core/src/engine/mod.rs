//! The operation engines: card-type resolution, resource-reference
//! spreading, resource and card lifecycle, and the background erasure
//! sweep. Each submodule exposes free functions over a [`ColabStore`]
//! plus a [`RequestContext`]; none of them holds state of its own.
//!
//! [`ColabStore`]: crate::store::ColabStore
//! [`RequestContext`]: crate::security::RequestContext

pub mod card_type;
pub mod lifecycle;
pub mod resources;
pub mod spreading;
pub mod sweep;
