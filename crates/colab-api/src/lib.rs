//! Entity model and error taxonomy for the coLAB card hierarchy engine.
//!
//! This crate holds the pure data types shared by the engine and its
//! collaborators: id newtypes, the card/content tree entities, the
//! polymorphic card-type and resource entities (tagged variants), and
//! the deletion-status types driving the bin lifecycle.

pub mod card;
pub mod card_content;
pub mod card_type;
pub mod deletion;
pub mod document;
pub mod error;
pub mod ids;
pub mod project;
pub mod resource;

pub use card::{Card, CardParent};
pub use card_content::{CardContent, CompletionMode, ContentStatus, LexicalConversion};
pub use card_type::{CardTypeData, CardTypeEntity, CardTypeKind, CardTypeRefData};
pub use deletion::{DeletionState, DeletionStatus};
pub use document::Document;
pub use error::{ColabError, Result};
pub use ids::{CardContentId, CardId, CardTypeId, DocumentId, ProjectId, ResourceId};
pub use project::Project;
pub use resource::{ResourceData, ResourceEntity, ResourceKind, ResourceOwner, ResourceRefData};
