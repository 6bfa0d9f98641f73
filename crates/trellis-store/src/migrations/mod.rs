//! Embedded schema migrations
//!
//! SQL files under `migrations/` are compiled in, checksummed, and applied
//! once each in id order. Re-running against an up-to-date store is a no-op.

mod checksums;
mod embedded;
mod runner;

pub use runner::{applied_migrations, apply_migrations};
