//! Snapshot import
//!
//! Configuration is read first (users, grants, then the file, page, component
//! and template manifests). Data is then rebuilt phase by phase in dependency
//! order, and the optional configuration script runs last.

use std::fs;
use std::path::Path;
use std::time::Instant;
use trellis_core::errors::ExError;
use trellis_core::model::{Entity, EntityKind, PropertyMap};
use trellis_core::{log_op_end, log_op_error, log_op_start, ConfigManifest, ExecutionContext};
use trellis_core_types::RunId;
use trellis_store::errors::{io_error, precondition};
use trellis_store::{
    bulk_graph_operation, GraphDb, Result, ScriptEvaluator, SqlScriptEvaluator, TxOptions,
};

use super::fsutil::{read_grants, read_manifest};
use super::layout::*;
use super::units::{ImportPhase, PhaseOperation};
use super::walk::discover;

const OP_IMPORT: &str = "snapshot_import";

/// Result of a full-replace configuration section
#[derive(Debug, Clone)]
pub enum SectionOutcome {
    /// No manifest in the snapshot; existing entities untouched
    Absent,
    /// Existing entities removed and this many recreated
    Replaced(usize),
    Failed(ExError),
}

#[derive(Debug, Clone)]
pub enum PhaseStatus {
    /// Directory absent from the snapshot
    Skipped,
    Completed,
    /// Walk abandoned after an I/O failure
    Aborted(ExError),
}

#[derive(Debug, Clone)]
pub struct PhaseReport {
    pub phase: ImportPhase,
    pub status: PhaseStatus,
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub failures: Vec<ExError>,
}

#[derive(Debug, Clone)]
pub enum ScriptOutcome {
    Absent,
    Applied,
    Failed(ExError),
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub run_id: RunId,
    pub users: SectionOutcome,
    pub grants: SectionOutcome,
    pub phases: Vec<PhaseReport>,
    pub script: ScriptOutcome,
}

impl ImportReport {
    pub fn phase(&self, phase: ImportPhase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }
}

/// Per-phase manifests, read before any data phase runs
struct PhaseManifests {
    files: ConfigManifest,
    pages: ConfigManifest,
    components: ConfigManifest,
    templates: ConfigManifest,
    none: ConfigManifest,
}

impl PhaseManifests {
    fn for_phase(&self, phase: ImportPhase) -> &ConfigManifest {
        match phase {
            ImportPhase::Files => &self.files,
            ImportPhase::Pages => &self.pages,
            ImportPhase::Components => &self.components,
            ImportPhase::Templates => &self.templates,
            ImportPhase::Schema => &self.none,
        }
    }
}

/// Rebuilds a graph from a snapshot directory
pub struct SnapshotImporter {
    commit_count: u64,
    script: Box<dyn ScriptEvaluator>,
    phase_order: Vec<ImportPhase>,
}

impl Default for SnapshotImporter {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_COMMIT_COUNT)
    }
}

impl SnapshotImporter {
    pub fn new(commit_count: u64) -> Self {
        Self {
            commit_count,
            script: Box::new(SqlScriptEvaluator),
            phase_order: ImportPhase::ORDER.to_vec(),
        }
    }

    pub fn with_script_evaluator(mut self, script: Box<dyn ScriptEvaluator>) -> Self {
        self.script = script;
        self
    }

    /// Override the data phase order
    ///
    /// Any order other than [`ImportPhase::ORDER`] can leave references unresolved.
    pub fn with_phase_order(mut self, order: Vec<ImportPhase>) -> Self {
        self.phase_order = order;
        self
    }

    /// Import the snapshot at `source`
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` when `source` is blank, missing or not a
    /// directory. Failures inside sections, phases and the script are
    /// reported, not returned.
    pub fn import(&self, db: &mut GraphDb, source: &Path) -> Result<ImportReport> {
        let source_display = source.display().to_string();
        log_op_start!(OP_IMPORT, source = %source_display);
        let start = Instant::now();

        check_source(source).map_err(|e| {
            log_op_error!(OP_IMPORT, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
            e
        })?;

        let run_id = RunId::new();
        let users = replace_users(db, &source.join(USERS_MANIFEST));
        let grants = replace_grants(db, &source.join(GRANTS_MANIFEST));
        let manifests = PhaseManifests {
            files: read_manifest(&source.join(FILES_MANIFEST)),
            pages: read_manifest(&source.join(PAGES_MANIFEST)),
            components: read_manifest(&source.join(COMPONENTS_MANIFEST)),
            templates: read_manifest(&source.join(TEMPLATES_MANIFEST)),
            none: ConfigManifest::new(),
        };

        let mut phases = Vec::with_capacity(self.phase_order.len());
        for phase in &self.phase_order {
            phases.push(self.run_phase(db, source, *phase, manifests.for_phase(*phase)));
        }
        let script = self.run_script(db, &source.join(DEPLOY_SCRIPT));

        log_op_end!(
            OP_IMPORT,
            duration_ms = start.elapsed().as_millis() as u64,
            run_id = %run_id
        );
        Ok(ImportReport {
            run_id,
            users,
            grants,
            phases,
            script,
        })
    }

    fn run_phase(
        &self,
        db: &mut GraphDb,
        source: &Path,
        phase: ImportPhase,
        manifest: &ConfigManifest,
    ) -> PhaseReport {
        let mut report = PhaseReport {
            phase,
            status: PhaseStatus::Skipped,
            processed: 0,
            created: 0,
            updated: 0,
            failures: Vec::new(),
        };
        let dir = source.join(phase.dir());
        if !dir.is_dir() {
            return report;
        }

        let units = match discover(&dir) {
            Ok(units) => units,
            Err(e) => {
                let err = io_error("discover_units", e).with_path(dir.display().to_string());
                tracing::warn!(component = "deploy", phase = phase.as_str(), error = %err, "walk failed");
                report.status = PhaseStatus::Aborted(err);
                return report;
            }
        };

        let description = format!("import {}", phase.as_str());
        let mut op = PhaseOperation::new(phase, manifest);
        let outcome = bulk_graph_operation(db, units, self.commit_count, Some(description.as_str()), &mut op);

        report.status = match op.take_abort() {
            Some(err) => PhaseStatus::Aborted(err),
            None => PhaseStatus::Completed,
        };
        report.processed = outcome.processed;
        report.created = op.created;
        report.updated = op.updated;
        report.failures = std::mem::take(&mut op.failures);
        report
    }

    fn run_script(&self, db: &mut GraphDb, path: &Path) -> ScriptOutcome {
        if !path.exists() {
            return ScriptOutcome::Absent;
        }
        let result = (|| -> Result<bool> {
            let text = fs::read_to_string(path).map_err(|e| io_error("read_script", e))?;
            let source = text.trim();
            if source.is_empty() {
                return Ok(false);
            }
            let tx = db.tx(TxOptions::default())?;
            self.script
                .evaluate(&tx, &ExecutionContext::super_user(), source)?;
            tx.commit()?;
            Ok(true)
        })();

        match result {
            Ok(true) => ScriptOutcome::Applied,
            Ok(false) => ScriptOutcome::Absent,
            Err(e) => {
                tracing::warn!(component = "deploy", op = OP_IMPORT, error = %e, "configuration script failed");
                ScriptOutcome::Failed(e)
            }
        }
    }
}

fn check_source(source: &Path) -> Result<()> {
    let shown = source.display().to_string();
    if shown.trim().is_empty() {
        return Err(precondition(OP_IMPORT, &shown, "source path is empty"));
    }
    if !source.exists() {
        return Err(precondition(OP_IMPORT, &shown, "source does not exist"));
    }
    if !source.is_dir() {
        return Err(precondition(OP_IMPORT, &shown, "source is not a directory"));
    }
    Ok(())
}

/// Delete every entity of `kind` and recreate one per record, in one transaction
fn replace_all<I>(db: &mut GraphDb, kind: EntityKind, records: I) -> SectionOutcome
where
    I: IntoIterator<Item = Result<Entity>>,
{
    let result = (|| -> Result<usize> {
        let tx = db.tx(TxOptions::default())?;
        tx.delete_all_of_kind(kind)?;
        let mut count = 0;
        for record in records {
            let mut entity = record?;
            tx.create(&mut entity)?;
            count += 1;
        }
        tx.commit()?;
        Ok(count)
    })();

    match result {
        Ok(count) => SectionOutcome::Replaced(count),
        Err(e) => {
            tracing::warn!(component = "deploy", kind = kind.as_str(), error = %e, "full replace rolled back");
            SectionOutcome::Failed(e)
        }
    }
}

fn replace_users(db: &mut GraphDb, path: &Path) -> SectionOutcome {
    if !path.exists() {
        return SectionOutcome::Absent;
    }
    let manifest = read_manifest(path);
    let records = manifest.keys().map(|name| -> Result<Entity> {
        let input = manifest.get(name).cloned().unwrap_or_default();
        let mut user = Entity::new(EntityKind::User).named(name.clone());
        user.properties = PropertyMap::from_input(EntityKind::User, &input)?;
        Ok(user)
    });
    replace_all(db, EntityKind::User, records)
}

fn replace_grants(db: &mut GraphDb, path: &Path) -> SectionOutcome {
    if !path.exists() {
        return SectionOutcome::Absent;
    }
    let records = read_grants(path).into_iter().map(|input| -> Result<Entity> {
        let mut grant = Entity::new(EntityKind::ResourceAccess);
        grant.properties = PropertyMap::from_input(EntityKind::ResourceAccess, &input)?;
        Ok(grant)
    });
    replace_all(db, EntityKind::ResourceAccess, records)
}
