use std::time::Instant;
use trellis_core::{log_op_end, log_op_error, log_op_start};
use trellis_core_types::schema::EVENT_PROGRESS;
use trellis_core_types::RunId;

use super::operation::{BulkGraphOperation, TransactionFailure};
use crate::errors::Result;
use crate::graph::{GraphDb, GraphTx, TxOptions};

/// Operation name attached to runner log events
pub const OP_BULK: &str = "bulk_graph_operation";

/// Counters reported by [`bulk_graph_operation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkOutcome {
    pub run_id: RunId,
    /// Items offered to the operation, including failed ones
    pub processed: u64,
    /// Commits of non-empty batches
    pub committed_batches: u64,
    pub failed_transactions: u64,
}

/// Iteration mode: feed `items` to `op` in batches of `commit_count`
///
/// Each batch runs in its own scope opened with `op.tx_options()`. The run
/// ends when an iteration pulls no item, either because the input is
/// exhausted or the operation's continuation predicate returned false.
/// `commit_count == 0` puts everything pulled in one iteration into a
/// single batch.
pub fn bulk_graph_operation<T, I, O>(
    db: &mut GraphDb,
    items: I,
    commit_count: u64,
    description: Option<&str>,
    op: &mut O,
) -> BulkOutcome
where
    I: IntoIterator<Item = T>,
    O: BulkGraphOperation<T> + ?Sized,
{
    let run_id = RunId::new();
    let mut items = items.into_iter();
    let mut outcome = BulkOutcome {
        run_id,
        processed: 0,
        committed_batches: 0,
        failed_transactions: 0,
    };

    let mut active = true;
    while active {
        active = false;
        let mut batch = Batch {
            pulled: 0,
            processed: &mut outcome.processed,
            active: &mut active,
        };

        match run_batch(db, &mut items, commit_count, op, &mut batch) {
            Ok(()) => {
                if batch.pulled > 0 {
                    outcome.committed_batches += 1;
                    op.on_batch_committed(outcome.processed);
                }
            }
            Err(failure) => {
                outcome.failed_transactions += 1;
                tracing::warn!(
                    component = "bulk",
                    op = OP_BULK,
                    run_id = %run_id,
                    processed = outcome.processed,
                    error = %failure,
                    "transaction failed"
                );
                op.on_transaction_failure(failure);
            }
        }

        if let Some(description) = description {
            tracing::info!(
                component = "bulk",
                op = OP_BULK,
                event = EVENT_PROGRESS,
                run_id = %run_id,
                processed = outcome.processed,
                "{}: {} objects processed",
                description,
                outcome.processed
            );
        }
    }

    outcome
}

struct Batch<'a> {
    pulled: u64,
    processed: &'a mut u64,
    active: &'a mut bool,
}

fn run_batch<T, I, O>(
    db: &mut GraphDb,
    items: &mut I,
    commit_count: u64,
    op: &mut O,
    batch: &mut Batch<'_>,
) -> std::result::Result<(), TransactionFailure>
where
    I: Iterator<Item = T>,
    O: BulkGraphOperation<T> + ?Sized,
{
    let tx = db.tx(op.tx_options()).map_err(TransactionFailure::Open)?;

    while op.should_continue(*batch.processed) {
        let Some(item) = items.next() else {
            break;
        };
        *batch.active = true;
        batch.pulled += 1;
        *batch.processed += 1;

        if let Err(err) = op.handle(&tx, &item) {
            // Escalation drops `tx`, rolling the batch back
            op.on_item_failure(err, &item)
                .map_err(TransactionFailure::Escalated)?;
        }

        if commit_count > 0 && *batch.processed % commit_count == 0 {
            break;
        }
    }

    tx.commit().map_err(TransactionFailure::Commit)
}

/// Closure mode: run `unit` until `stop(count)` holds
///
/// At most `commit_count` executions share a scope (`0` means unbounded).
/// Unlike iteration mode, the first error rolls back the open batch and is
/// returned to the caller.
///
/// # Errors
///
/// Returns the first error from opening a scope, from `unit`, or from commit.
pub fn bulk_transaction<F, S>(
    db: &mut GraphDb,
    commit_count: u64,
    options: TxOptions,
    mut unit: F,
    stop: S,
) -> Result<u64>
where
    F: FnMut(&GraphTx<'_>) -> Result<()>,
    S: Fn(u64) -> bool,
{
    log_op_start!("bulk_transaction", commit_count = commit_count);
    let start = Instant::now();

    let mut count = 0u64;
    let result = (|| -> Result<u64> {
        while !stop(count) {
            let tx = db.tx(options)?;
            let mut in_batch = 0u64;
            while !stop(count) && (commit_count == 0 || in_batch < commit_count) {
                unit(&tx)?;
                count += 1;
                in_batch += 1;
            }
            tx.commit()?;
        }
        Ok(count)
    })();

    match &result {
        Ok(n) => {
            log_op_end!(
                "bulk_transaction",
                duration_ms = start.elapsed().as_millis() as u64,
                processed = *n
            );
        }
        Err(e) => {
            log_op_error!(
                "bulk_transaction",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64
            );
        }
    }
    result
}
