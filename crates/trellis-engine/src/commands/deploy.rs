//! Deploy command: snapshot export or import selected by mode

use std::path::Path;
use std::time::Instant;
use trellis_core::{log_op_end, log_op_error, log_op_start};
use trellis_store::{GraphDb, Result};

use crate::config::TrellisConfig;
use crate::deploy::{ExportReport, ImportReport, SnapshotExporter, SnapshotImporter};

const OP_DEPLOY: &str = "deploy";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployMode {
    Export,
    Import,
}

impl DeployMode {
    /// `"export"` selects export; anything else, including no value, imports
    pub fn from_param(mode: Option<&str>) -> Self {
        match mode {
            Some("export") => DeployMode::Export,
            _ => DeployMode::Import,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeployMode::Export => "export",
            DeployMode::Import => "import",
        }
    }
}

#[derive(Debug, Clone)]
pub enum DeployOutcome {
    Exported(ExportReport),
    Imported(ImportReport),
}

/// Run a snapshot export to, or import from, `path`
///
/// # Errors
///
/// Returns the precondition error of the selected direction.
pub fn deploy(
    db: &mut GraphDb,
    mode: DeployMode,
    path: &Path,
    config: &TrellisConfig,
) -> Result<DeployOutcome> {
    log_op_start!(OP_DEPLOY, mode = mode.as_str());
    let start = Instant::now();

    let result = match mode {
        DeployMode::Export => SnapshotExporter::new()
            .export(db, path)
            .map(DeployOutcome::Exported),
        DeployMode::Import => SnapshotImporter::new(config.commit_count)
            .import(db, path)
            .map(DeployOutcome::Imported),
    };

    let outcome = result.map_err(|e| {
        log_op_error!(OP_DEPLOY, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
        e
    })?;

    log_op_end!(OP_DEPLOY, duration_ms = start.elapsed().as_millis() as u64);
    Ok(outcome)
}
