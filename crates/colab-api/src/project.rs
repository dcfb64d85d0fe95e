use serde::{Deserialize, Serialize};

use crate::ids::{CardId, ProjectId};

/// A project: the root of one card hierarchy.
///
/// Every project owns exactly one root card; the root card is the only
/// card without a parent card content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub root_card: CardId,
}

impl Project {
    pub fn new(id: ProjectId, name: impl Into<String>, root_card: CardId) -> Self {
        Self {
            id,
            name: name.into(),
            root_card,
        }
    }
}
