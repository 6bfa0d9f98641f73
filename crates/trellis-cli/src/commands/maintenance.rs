//! Maintenance commands

use clap::{Args, Subcommand};
use trellis_engine::{apply_engine_command, EngineCommand, EngineCommandResult};

use super::{open, GlobalArgs};

#[derive(Debug, Args)]
pub struct MaintenanceArgs {
    #[command(subcommand)]
    pub command: MaintenanceCommand,
}

#[derive(Debug, Subcommand)]
pub enum MaintenanceCommand {
    /// Recompute the stored path of every entity
    RebuildPaths,
    /// Physically remove everything in trash
    PurgeTrash,
}

pub fn execute(global: &GlobalArgs, args: MaintenanceArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut db) = open(global)?;
    let (label, cmd) = match args.command {
        MaintenanceCommand::RebuildPaths => ("Paths rebuilt", EngineCommand::RebuildPaths),
        MaintenanceCommand::PurgeTrash => ("Trash purged", EngineCommand::PurgeTrash),
    };

    if let EngineCommandResult::Maintenance(report) = apply_engine_command(cmd, &mut db, &config)? {
        println!("{}:", label);
        println!("  processed: {}", report.outcome.processed);
        println!("  changed: {}", report.changed);
        println!("  failed: {}", report.failed);
        println!("  batches: {}", report.outcome.committed_batches);
    }
    Ok(())
}
