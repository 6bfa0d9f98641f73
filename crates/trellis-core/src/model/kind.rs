use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::TrellisError;

/// Type tag of a graph entity
///
/// The tag decides which snapshot category an entity belongs to and which
/// structural rules apply when it is validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Folder,
    File,
    Page,
    Component,
    Template,
    User,
    ResourceAccess,
}

impl EntityKind {
    pub const ALL: [EntityKind; 7] = [
        EntityKind::Folder,
        EntityKind::File,
        EntityKind::Page,
        EntityKind::Component,
        EntityKind::Template,
        EntityKind::User,
        EntityKind::ResourceAccess,
    ];

    /// Stable tag stored in the `kind` column
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Folder => "Folder",
            EntityKind::File => "File",
            EntityKind::Page => "Page",
            EntityKind::Component => "Component",
            EntityKind::Template => "Template",
            EntityKind::User => "User",
            EntityKind::ResourceAccess => "ResourceAccess",
        }
    }

    /// Kinds that must carry a non-empty name
    pub fn requires_name(&self) -> bool {
        matches!(
            self,
            EntityKind::Folder | EntityKind::File | EntityKind::Page | EntityKind::User
        )
    }

    /// Kinds that take part in a parent/child tree
    pub fn is_hierarchical(&self) -> bool {
        !matches!(self, EntityKind::User | EntityKind::ResourceAccess)
    }

    /// Kinds whose content is rendered into a companion text file on export
    pub fn is_renderable(&self) -> bool {
        matches!(
            self,
            EntityKind::Page | EntityKind::Component | EntityKind::Template
        )
    }

    /// Kinds that may own children of the given kind
    pub fn accepts_child(&self, child: EntityKind) -> bool {
        match self {
            EntityKind::Folder => matches!(child, EntityKind::Folder | EntityKind::File),
            EntityKind::Page | EntityKind::Component => matches!(
                child,
                EntityKind::Component | EntityKind::Template
            ),
            _ => false,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = TrellisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| TrellisError::UnknownKind { tag: s.to_string() })
    }
}
