use serde::{Deserialize, Serialize};

use crate::deletion::DeletionState;
use crate::ids::{CardContentId, CardId, CardTypeId, DocumentId, ResourceId};

/// The single owner of a resource or resource reference.
///
/// Ownership is mutually exclusive by construction: a resource hangs off
/// exactly one card type, card, or card content.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceOwner {
    CardType { card_type: CardTypeId },
    Card { card: CardId },
    Content { content: CardContentId },
}

impl ResourceOwner {
    pub fn card_type(id: CardTypeId) -> Self {
        ResourceOwner::CardType { card_type: id }
    }

    pub fn card(id: CardId) -> Self {
        ResourceOwner::Card { card: id }
    }

    pub fn content(id: CardContentId) -> Self {
        ResourceOwner::Content { content: id }
    }
}

/// Payload of a concrete resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceData {
    pub title: Option<String>,
    /// Short text block shown before opening the resource.
    pub teaser: Option<DocumentId>,
    pub published: bool,
    pub deprecated: bool,
    pub requesting_for_glory: bool,
    /// Ordered attached documents.
    pub documents: Vec<DocumentId>,
    pub deletion: DeletionState,
}

/// Payload of a resource reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRefData {
    /// The referenced resource or reference; chains resolve to exactly one
    /// concrete resource when well formed.
    pub target: ResourceId,
    /// The owner does not want this inherited resource.
    pub refused: bool,
    /// The upstream path that produced this reference no longer exists
    /// (owner moved away, resource unpublished); kept for revival.
    pub residual: bool,
}

/// Concrete resource vs. reference, as a tagged variant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ResourceKind {
    Concrete(ResourceData),
    Ref(ResourceRefData),
}

/// A help document or a reference to one, propagated down the hierarchy
/// by the spreading engine. References are never created directly by a
/// user-facing operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceEntity {
    pub id: ResourceId,
    pub owner: ResourceOwner,
    /// Free categorization label; trimmed, empty collapses to `None`.
    pub category: Option<String>,
    pub kind: ResourceKind,
}

impl ResourceEntity {
    pub fn concrete(id: ResourceId, owner: ResourceOwner, title: Option<String>) -> Self {
        Self {
            id,
            owner,
            category: None,
            kind: ResourceKind::Concrete(ResourceData {
                title,
                ..ResourceData::default()
            }),
        }
    }

    pub fn reference(id: ResourceId, owner: ResourceOwner, target: ResourceId) -> Self {
        Self {
            id,
            owner,
            category: None,
            kind: ResourceKind::Ref(ResourceRefData {
                target,
                refused: false,
                residual: false,
            }),
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, ResourceKind::Concrete(_))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self.kind, ResourceKind::Ref(_))
    }

    pub fn as_concrete(&self) -> Option<&ResourceData> {
        match &self.kind {
            ResourceKind::Concrete(data) => Some(data),
            ResourceKind::Ref(_) => None,
        }
    }

    pub fn as_concrete_mut(&mut self) -> Option<&mut ResourceData> {
        match &mut self.kind {
            ResourceKind::Concrete(data) => Some(data),
            ResourceKind::Ref(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ResourceRefData> {
        match &self.kind {
            ResourceKind::Concrete(_) => None,
            ResourceKind::Ref(data) => Some(data),
        }
    }

    pub fn as_reference_mut(&mut self) -> Option<&mut ResourceRefData> {
        match &mut self.kind {
            ResourceKind::Concrete(_) => None,
            ResourceKind::Ref(data) => Some(data),
        }
    }

    /// Direct target of a reference, `None` for a concrete resource.
    pub fn target(&self) -> Option<ResourceId> {
        self.as_reference().map(|r| r.target)
    }

    /// Set the category, trimming whitespace and collapsing empty to `None`.
    pub fn set_category(&mut self, category: Option<&str>) {
        self.category = category
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_is_trimmed_and_empty_collapses_to_none() {
        let mut res = ResourceEntity::concrete(
            ResourceId(1),
            ResourceOwner::card(crate::ids::CardId(1)),
            None,
        );
        res.set_category(Some("  guides  "));
        assert_eq!(res.category.as_deref(), Some("guides"));
        res.set_category(Some("   "));
        assert_eq!(res.category, None);
        res.set_category(None);
        assert_eq!(res.category, None);
    }
}
