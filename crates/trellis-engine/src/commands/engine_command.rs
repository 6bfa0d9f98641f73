//! Engine-level commands dispatched by the CLI

use std::path::PathBuf;
use trellis_store::bulk::{purge_trash, rebuild_paths, MaintenanceReport};
use trellis_store::{GraphDb, Result};

use super::deploy::{deploy, DeployMode, DeployOutcome};
use crate::config::TrellisConfig;

/// Engine-level commands that need the store and the file system
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Export to or import from a snapshot directory
    Deploy { mode: DeployMode, path: PathBuf },
    /// Re-derive the stored path of every entity
    RebuildPaths,
    /// Physically remove entities in trash
    PurgeTrash,
}

#[derive(Debug, Clone)]
pub enum EngineCommandResult {
    Deploy(DeployOutcome),
    Maintenance(MaintenanceReport),
}

/// Apply an engine command against `db`
///
/// # Errors
///
/// Returns precondition errors from deploy and listing errors from maintenance.
pub fn apply_engine_command(
    cmd: EngineCommand,
    db: &mut GraphDb,
    config: &TrellisConfig,
) -> Result<EngineCommandResult> {
    match cmd {
        EngineCommand::Deploy { mode, path } => {
            deploy(db, mode, &path, config).map(EngineCommandResult::Deploy)
        }
        EngineCommand::RebuildPaths => {
            rebuild_paths(db, config.commit_count).map(EngineCommandResult::Maintenance)
        }
        EngineCommand::PurgeTrash => {
            purge_trash(db, config.commit_count).map(EngineCommandResult::Maintenance)
        }
    }
}
