use serde::{Deserialize, Serialize};

use crate::deletion::DeletionState;
use crate::ids::{CardContentId, CardId, CardTypeId, ProjectId};

/// Where a card hangs in the tree.
///
/// A card is either the root card of exactly one project or a sub-card of
/// one card content — never both, never neither once persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CardParent {
    Root { project: ProjectId },
    Content { parent: CardContentId },
}

/// A node in the project hierarchy.
///
/// Grid geometry is relative to the siblings sharing the same parent card
/// content; the grid component keeps sibling rectangles non-overlapping
/// and anchored at (1,1).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub title: Option<String>,
    pub color: Option<String>,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub parent: CardParent,
    pub card_type: Option<CardTypeId>,
    pub deletion: DeletionState,
}

impl Card {
    /// Build a card with default 1x1 geometry at the origin.
    pub fn new(id: CardId, parent: CardParent) -> Self {
        Self {
            id,
            title: None,
            color: None,
            x: 1,
            y: 1,
            width: 1,
            height: 1,
            parent,
            card_type: None,
            deletion: DeletionState::alive(),
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.parent, CardParent::Root { .. })
    }

    /// The parent card content, `None` for a project's root card.
    pub fn parent_content(&self) -> Option<CardContentId> {
        match self.parent {
            CardParent::Root { .. } => None,
            CardParent::Content { parent } => Some(parent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn card_parent_serializes_with_a_type_tag() {
        let root = CardParent::Root {
            project: ProjectId(7),
        };
        assert_eq!(
            serde_json::to_value(root).unwrap(),
            json!({"type": "Root", "project": 7})
        );

        let nested = CardParent::Content {
            parent: CardContentId(12),
        };
        assert_eq!(
            serde_json::to_value(nested).unwrap(),
            json!({"type": "Content", "parent": 12})
        );
        let back: CardParent = serde_json::from_value(json!({"type": "Content", "parent": 12}))
            .unwrap();
        assert_eq!(back, nested);
    }
}
