//! Deploy command

use clap::{Args, Subcommand};
use std::path::PathBuf;
use trellis_engine::commands::{DeployMode, DeployOutcome};
use trellis_engine::deploy::{PhaseStatus, ScriptOutcome, SectionOutcome};
use trellis_engine::{apply_engine_command, EngineCommand, EngineCommandResult};

use super::{open, GlobalArgs};

#[derive(Debug, Args)]
pub struct DeployArgs {
    #[command(subcommand)]
    pub command: DeployCommand,
}

#[derive(Debug, Subcommand)]
pub enum DeployCommand {
    /// Write a snapshot into a new directory
    Export {
        /// Target directory; must not exist
        target: PathBuf,
    },
    /// Rebuild the graph from a snapshot directory
    Import {
        /// Snapshot directory
        source: PathBuf,
    },
}

pub fn execute(global: &GlobalArgs, args: DeployArgs) -> Result<(), Box<dyn std::error::Error>> {
    let (config, mut db) = open(global)?;
    let cmd = match args.command {
        DeployCommand::Export { target } => EngineCommand::Deploy {
            mode: DeployMode::Export,
            path: target,
        },
        DeployCommand::Import { source } => EngineCommand::Deploy {
            mode: DeployMode::Import,
            path: source,
        },
    };

    match apply_engine_command(cmd, &mut db, &config)? {
        EngineCommandResult::Deploy(DeployOutcome::Exported(report)) => {
            println!("Snapshot exported:");
            for category in &report.categories {
                match &category.failure {
                    None => println!("  {}: {}", category.category.as_str(), category.written),
                    Some(err) => println!("  {}: failed ({})", category.category.as_str(), err),
                }
            }
        }
        EngineCommandResult::Deploy(DeployOutcome::Imported(report)) => {
            println!("Snapshot imported:");
            println!("  users: {}", section(&report.users));
            println!("  grants: {}", section(&report.grants));
            for phase in &report.phases {
                let status = match &phase.status {
                    PhaseStatus::Skipped => "skipped".to_string(),
                    PhaseStatus::Completed => "completed".to_string(),
                    PhaseStatus::Aborted(err) => format!("aborted ({})", err),
                };
                println!(
                    "  {}: {} (created {}, updated {}, failed {})",
                    phase.phase.as_str(),
                    status,
                    phase.created,
                    phase.updated,
                    phase.failures.len()
                );
            }
            let script = match &report.script {
                ScriptOutcome::Absent => "none".to_string(),
                ScriptOutcome::Applied => "applied".to_string(),
                ScriptOutcome::Failed(err) => format!("failed ({})", err),
            };
            println!("  script: {}", script);
        }
        EngineCommandResult::Maintenance(_) => {}
    }
    Ok(())
}

fn section(outcome: &SectionOutcome) -> String {
    match outcome {
        SectionOutcome::Absent => "none".to_string(),
        SectionOutcome::Replaced(n) => format!("replaced ({})", n),
        SectionOutcome::Failed(err) => format!("failed ({})", err),
    }
}
