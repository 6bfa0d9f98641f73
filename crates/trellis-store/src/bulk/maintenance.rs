//! Maintenance passes built on the batch runner

use trellis_core::errors::ExError;

use super::operation::BulkGraphOperation;
use super::runner::{bulk_graph_operation, BulkOutcome};
use crate::errors::Result;
use crate::graph::{GraphDb, GraphTx, TxOptions};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Entities whose stored state was changed
    pub changed: u64,
    pub failed: u64,
    pub outcome: BulkOutcome,
}

/// Re-derives the stored `path` of every entity
#[derive(Debug, Default)]
struct RebuildPaths {
    changed: u64,
    failed: u64,
}

impl BulkGraphOperation<String> for RebuildPaths {
    fn handle(&mut self, tx: &GraphTx<'_>, id: &String) -> Result<()> {
        let Some(entity) = tx.get(id)? else {
            return Ok(());
        };
        let path = tx.derive_path(&entity)?;
        if path != entity.path {
            tx.set_path(&entity.id, path.as_deref())?;
            self.changed += 1;
        }
        Ok(())
    }

    fn on_item_failure(&mut self, err: ExError, id: &String) -> Result<()> {
        tracing::warn!(component = "maintenance", entity_id = %id, error = %err, "path rebuild failed");
        self.failed += 1;
        Ok(())
    }

    fn tx_options(&self) -> TxOptions {
        TxOptions::unchecked()
    }
}

/// Physically removes trashed entities
#[derive(Debug, Default)]
struct PurgeTrash {
    removed: u64,
    failed: u64,
}

impl BulkGraphOperation<String> for PurgeTrash {
    fn handle(&mut self, tx: &GraphTx<'_>, id: &String) -> Result<()> {
        // Already gone when an ancestor was purged earlier in the run
        if tx.get(id)?.is_some() {
            self.removed += tx.delete(id)? as u64;
        }
        Ok(())
    }

    fn on_item_failure(&mut self, err: ExError, id: &String) -> Result<()> {
        tracing::warn!(component = "maintenance", entity_id = %id, error = %err, "purge failed");
        self.failed += 1;
        Ok(())
    }

    fn tx_options(&self) -> TxOptions {
        TxOptions::unchecked().with_notifications(true)
    }
}

/// Recompute the derived path column for every entity
///
/// Runs with validation, callbacks and notifications off.
///
/// # Errors
///
/// Fails only if the entity ids cannot be listed.
pub fn rebuild_paths(db: &mut GraphDb, commit_count: u64) -> Result<MaintenanceReport> {
    let ids = db.read_tx()?.all_ids()?;
    let mut op = RebuildPaths::default();
    let outcome = bulk_graph_operation(db, ids, commit_count, Some("Rebuild paths"), &mut op);
    Ok(MaintenanceReport {
        changed: op.changed,
        failed: op.failed,
        outcome,
    })
}

/// Remove every entity currently in trash
///
/// # Errors
///
/// Fails only if the trashed ids cannot be listed.
pub fn purge_trash(db: &mut GraphDb, commit_count: u64) -> Result<MaintenanceReport> {
    let ids = db.read_tx()?.trashed_ids()?;
    let mut op = PurgeTrash::default();
    let outcome = bulk_graph_operation(db, ids, commit_count, Some("Purge trash"), &mut op);
    Ok(MaintenanceReport {
        changed: op.removed,
        failed: op.failed,
        outcome,
    })
}
