use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::ids::{CardTypeId, DocumentId, ProjectId};

/// Payload of a concrete card type.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTypeData {
    pub title: Option<String>,
    pub tags: BTreeSet<String>,
    /// Text block describing what cards of this type are for.
    pub purpose: Option<DocumentId>,
}

/// Payload of a card-type reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTypeRefData {
    /// The referenced type or reference; chains must stay acyclic and
    /// terminate in a concrete type.
    pub target: CardTypeId,
}

/// Concrete type vs. reference, as a tagged variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CardTypeKind {
    Concrete(CardTypeData),
    Ref(CardTypeRefData),
}

/// A card type definition or a reference to one, possibly chained across
/// projects. `project == None` means the type is global.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardTypeEntity {
    pub id: CardTypeId,
    pub project: Option<ProjectId>,
    pub published: bool,
    pub deprecated: bool,
    pub kind: CardTypeKind,
}

impl CardTypeEntity {
    pub fn concrete(id: CardTypeId, project: Option<ProjectId>, title: Option<String>) -> Self {
        Self {
            id,
            project,
            published: false,
            deprecated: false,
            kind: CardTypeKind::Concrete(CardTypeData {
                title,
                tags: BTreeSet::new(),
                purpose: None,
            }),
        }
    }

    pub fn reference(id: CardTypeId, project: Option<ProjectId>, target: CardTypeId) -> Self {
        Self {
            id,
            project,
            published: false,
            deprecated: false,
            kind: CardTypeKind::Ref(CardTypeRefData { target }),
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, CardTypeKind::Concrete(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, CardTypeKind::Ref(_))
    }

    pub fn as_concrete(&self) -> Option<&CardTypeData> {
        match &self.kind {
            CardTypeKind::Concrete(data) => Some(data),
            CardTypeKind::Ref(_) => None,
        }
    }

    pub fn as_concrete_mut(&mut self) -> Option<&mut CardTypeData> {
        match &mut self.kind {
            CardTypeKind::Concrete(data) => Some(data),
            CardTypeKind::Ref(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&CardTypeRefData> {
        match &self.kind {
            CardTypeKind::Concrete(_) => None,
            CardTypeKind::Ref(data) => Some(data),
        }
    }

    /// Direct target of a reference, `None` for a concrete type.
    pub fn target(&self) -> Option<CardTypeId> {
        self.as_reference().map(|r| r.target)
    }
}
