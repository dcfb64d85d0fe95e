use serde::{Deserialize, Serialize};

use crate::deletion::DeletionState;
use crate::ids::{CardContentId, CardId, DocumentId};

/// Editorial status of one card content variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentStatus {
    Active,
    Preparation,
    Validated,
    Rejected,
    Postponed,
    Archived,
}

/// How the completion level is maintained.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompletionMode {
    #[default]
    Manual,
    Auto,
    NoOp,
}

/// Conversion state of the deliverable text toward the lexical editor format.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LexicalConversion {
    #[default]
    NoConversion,
    Pending,
    Verified,
}

/// One variant of a card's content.
///
/// Owns the ordered deliverable documents and (through the store index)
/// the sub-cards placed under it. A card must always retain at least one
/// alive variant; the lifecycle manager enforces this.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardContent {
    pub id: CardContentId,
    pub card: CardId,
    pub title: Option<String>,
    pub status: Option<ContentStatus>,
    /// 0..=100, clamped by [`CardContent::set_completion_level`].
    pub completion_level: i32,
    pub completion_mode: CompletionMode,
    pub frozen: bool,
    pub lexical_conversion: LexicalConversion,
    /// Ordered deliverables; ordering is the vec order.
    pub deliverables: Vec<DocumentId>,
    pub deletion: DeletionState,
}

impl CardContent {
    pub fn new(id: CardContentId, card: CardId) -> Self {
        Self {
            id,
            card,
            title: None,
            status: None,
            completion_level: 0,
            completion_mode: CompletionMode::default(),
            frozen: false,
            lexical_conversion: LexicalConversion::default(),
            deliverables: Vec::new(),
            deletion: DeletionState::alive(),
        }
    }

    pub fn set_completion_level(&mut self, level: i32) {
        self.completion_level = level.clamp(0, 100);
    }
}
