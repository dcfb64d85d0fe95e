use serde::{Deserialize, Serialize};

use crate::ids::DocumentId;

/// Minimal text-block document.
///
/// Stands in for the block collaborator that seeds card-type purposes and
/// resource teasers; deliverable ordering lives on the owning card content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub body: String,
}

impl Document {
    pub fn new(id: DocumentId, body: impl Into<String>) -> Self {
        Self {
            id,
            body: body.into(),
        }
    }
}
