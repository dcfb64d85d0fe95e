//! Id newtypes for every entity kind.
//!
//! Ids are plain `u64` counters allocated by the store. Keeping them as
//! distinct newtypes prevents a card id from being handed to a resource
//! lookup by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(raw: u64) -> Self {
                Self(raw)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> u64 {
                id.0
            }
        }
    };
}

id_newtype!(
    /// Identifies a project.
    ProjectId
);
id_newtype!(
    /// Identifies a card.
    CardId
);
id_newtype!(
    /// Identifies a card content (one variant of a card).
    CardContentId
);
id_newtype!(
    /// Identifies a card type or a card-type reference.
    CardTypeId
);
id_newtype!(
    /// Identifies a resource or a resource reference.
    ResourceId
);
id_newtype!(
    /// Identifies a document (text block or deliverable).
    DocumentId
);
