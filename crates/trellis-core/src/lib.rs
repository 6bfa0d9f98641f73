//! Trellis Core - graph model and shared contracts
//!
//! This crate provides the store-independent pieces of Trellis:
//! - Entity model (kinds, property maps, trash state)
//! - Canonical error facility and structured logging facility
//! - Background identifier producer feeding entity creation
//! - Configuration manifests used by snapshot export/import
//! - Narrow collaborator contracts (rendering, execution context)

pub mod context;
pub mod errors;
pub mod ident;
pub mod logging_facility;
pub mod manifest;
pub mod model;
pub mod render;

// Re-export commonly used types
pub use context::ExecutionContext;
pub use errors::{ExError, ExErrorKind, Result, TrellisError};
pub use ident::{next_identifier, IdentifierProducer};
pub use manifest::{ConfigManifest, GrantRecord};
pub use model::{Entity, EntityKind, PropertyMap};
pub use render::{Renderer, StoredContentRenderer};
