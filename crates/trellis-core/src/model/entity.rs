use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::kind::EntityKind;
use super::properties::PropertyMap;
use crate::ident::next_identifier;

/// A node in the content graph
///
/// Entities are mutated only inside a store transaction. `path` is derived by
/// the store from the parent chain and is never authoritative on input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// 32-character lowercase hex identifier
    pub id: String,

    pub kind: EntityKind,

    /// Display name; optional for components, templates and grants
    pub name: Option<String>,

    /// Structural parent (None for top-level nodes)
    pub parent_id: Option<String>,

    /// Derived `/a/b/c` path, filled in by the store
    pub path: Option<String>,

    pub properties: PropertyMap,

    /// Binary payload for files, stored markup for renderable kinds
    pub content: Option<Vec<u8>>,

    /// Trash flag - trashed entities are skipped by traversal
    pub deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity {
    /// Create a new entity with an identifier drawn from the global pool
    pub fn new(kind: EntityKind) -> Self {
        Self::with_id(next_identifier(), kind)
    }

    /// Create a new entity with a caller-supplied identifier
    pub fn with_id(id: String, kind: EntityKind) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            name: None,
            parent_id: None,
            path: None,
            properties: PropertyMap::new(),
            content: None,
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn under(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Name used on disk and in manifests, falling back to the identifier
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(n) if !n.is_empty() => n,
            _ => &self.id,
        }
    }

    pub fn is_top_level(&self) -> bool {
        self.parent_id.is_none()
    }

    pub fn in_trash(&self) -> bool {
        self.deleted
    }

    /// Stored content as UTF-8 text, if present and valid
    pub fn content_text(&self) -> Option<&str> {
        self.content
            .as_deref()
            .and_then(|bytes| std::str::from_utf8(bytes).ok())
    }
}

/// Returns true if `candidate` looks like an identifier produced by the pool
pub fn is_identifier(candidate: &str) -> bool {
    candidate.len() == 32
        && candidate
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
