pub mod deploy;
pub mod maintenance;

use clap::Args;
use std::path::PathBuf;
use trellis_core::logging_facility;
use trellis_engine::TrellisConfig;
use trellis_store::GraphDb;

/// Options shared by every command
#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Configuration file (defaults to ./trellis.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Graph database path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Items per transaction in bulk passes; 0 means one transaction
    #[arg(long, global = true)]
    pub commit_count: Option<u64>,
}

/// Resolve configuration, start logging and open the store
pub fn open(global: &GlobalArgs) -> Result<(TrellisConfig, GraphDb), Box<dyn std::error::Error>> {
    let config = TrellisConfig::load(global.config.as_deref())?
        .with_overrides(global.db.clone(), global.commit_count);
    logging_facility::init(config.log_profile);
    let db = GraphDb::open(&config.db_path)?;
    Ok((config, db))
}
