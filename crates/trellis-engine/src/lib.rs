//! Trellis Engine - snapshot pipeline and command orchestration
//!
//! Coordinates the graph store and the file system:
//! - `deploy`: snapshot export and dependency-ordered import
//! - `commands`: engine-level commands dispatched by the CLI
//! - `config`: TOML configuration with CLI overrides

pub mod commands;
pub mod config;
pub mod deploy;

pub use commands::{apply_engine_command, EngineCommand, EngineCommandResult};
pub use config::TrellisConfig;
pub use deploy::{SnapshotExporter, SnapshotImporter};
