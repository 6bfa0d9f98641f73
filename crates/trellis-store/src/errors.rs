//! Constructors for the [`ExError`]s raised by the store
//!
//! Every fallible store call returns [`Result`]; callers match on
//! [`ExErrorKind`] rather than on messages.

use std::fmt::Display;
use trellis_core::errors::{ExError, ExErrorKind};

pub type Result<T> = std::result::Result<T, ExError>;

fn failed(kind: ExErrorKind, op: &str, cause: impl Display) -> ExError {
    ExError::new(kind).with_op(op).with_message(cause.to_string())
}

pub fn migration_error(migration_id: &str, reason: &str) -> ExError {
    failed(ExErrorKind::Persistence, "migration", reason).with_entity_id(migration_id)
}

/// The SQL of an applied migration changed after it was recorded
pub fn checksum_mismatch(migration_id: &str, recorded: &str, embedded: &str) -> ExError {
    failed(
        ExErrorKind::Persistence,
        "migration_checksum",
        format_args!("recorded {} but embedded SQL hashes to {}", recorded, embedded),
    )
    .with_entity_id(migration_id)
}

pub fn from_rusqlite(err: rusqlite::Error) -> ExError {
    failed(ExErrorKind::Persistence, "sqlite", err)
}

pub fn io_error(op: &str, err: std::io::Error) -> ExError {
    failed(ExErrorKind::Io, op, err)
}

/// A stored JSON column or a manifest failed to (de)serialize
pub fn serialization_error(op: &str, err: serde_json::Error) -> ExError {
    failed(ExErrorKind::Serialization, op, err)
}

/// Raised before a command has touched the store or the file system
pub fn precondition(op: &str, path: &str, reason: &str) -> ExError {
    failed(ExErrorKind::PreconditionFailed, op, reason).with_path(path)
}

pub fn validation(op: &str, entity_id: &str, reason: String) -> ExError {
    failed(ExErrorKind::ValidationFailed, op, reason).with_entity_id(entity_id)
}
