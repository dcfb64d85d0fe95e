//! Error taxonomy for the engine.
//!
//! Every failure surfaces synchronously; nothing is retried internally.
//! Not-found and data-integrity errors are caller errors and map to
//! 4xx-class responses at the (external) REST boundary.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColabError {
    /// A requested entity id did not resolve.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: u64 },

    /// A structural invariant would be broken by the requested operation.
    #[error("data integrity violation: {0}")]
    DataIntegrity(String),

    /// A reference chain does not terminate in a concrete target, and the
    /// operation requires one. Read paths tolerate this state and return
    /// `None` instead.
    #[error("{entity} {id}: reference chain does not resolve to a concrete target")]
    UnresolvedChain { entity: &'static str, id: u64 },
}

impl ColabError {
    pub fn not_found(entity: &'static str, id: impl Into<u64>) -> Self {
        ColabError::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub fn integrity(message: impl Into<String>) -> Self {
        ColabError::DataIntegrity(message.into())
    }

    pub fn unresolved(entity: &'static str, id: impl Into<u64>) -> Self {
        ColabError::UnresolvedChain {
            entity,
            id: id.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ColabError::NotFound { .. })
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, ColabError::DataIntegrity(_))
    }
}

pub type Result<T> = std::result::Result<T, ColabError>;
