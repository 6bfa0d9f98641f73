//! Trellis CLI
//!
//! Command-line interface for snapshot deploys and store maintenance

use clap::{Parser, Subcommand};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "trellis")]
#[command(about = "Trellis - content graph snapshots and bulk maintenance", long_about = None)]
struct Cli {
    #[command(flatten)]
    global: commands::GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Snapshot export and import
    Deploy(commands::deploy::DeployArgs),
    /// Bulk maintenance passes over the store
    Maintenance(commands::maintenance::MaintenanceArgs),
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Deploy(args) => commands::deploy::execute(&cli.global, args),
        Commands::Maintenance(args) => commands::maintenance::execute(&cli.global, args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
