use thiserror::Error;
use trellis_core::errors::ExError;

use crate::errors::Result;
use crate::graph::{GraphTx, TxOptions};

/// Why a whole batch was abandoned
#[derive(Debug, Clone, Error)]
pub enum TransactionFailure {
    /// The scope could not be opened
    #[error("could not open transaction: {0}")]
    Open(ExError),

    /// An item failure was escalated by the operation
    #[error("item failure escalated: {0}")]
    Escalated(ExError),

    /// The scope could not be committed
    #[error("commit failed: {0}")]
    Commit(ExError),
}

impl TransactionFailure {
    pub fn error(&self) -> &ExError {
        match self {
            TransactionFailure::Open(e)
            | TransactionFailure::Escalated(e)
            | TransactionFailure::Commit(e) => e,
        }
    }
}

/// Strategy driven by [`bulk_graph_operation`](super::bulk_graph_operation)
///
/// Only `handle` is required. The hooks default to "log and continue", no
/// extra stopping condition, and all three transaction toggles on.
pub trait BulkGraphOperation<T> {
    /// Apply the operation to one item inside the current scope
    ///
    /// # Errors
    ///
    /// An error is routed to [`on_item_failure`](Self::on_item_failure), not
    /// propagated.
    fn handle(&mut self, tx: &GraphTx<'_>, item: &T) -> Result<()>;

    /// Recover from a failed item; returning `Err` aborts the current batch
    ///
    /// # Errors
    ///
    /// Returning an error escalates to a transaction failure.
    fn on_item_failure(&mut self, err: ExError, _item: &T) -> Result<()> {
        tracing::warn!(component = "bulk", error = %err, "item failed, continuing");
        Ok(())
    }

    /// Called once per abandoned batch
    fn on_transaction_failure(&mut self, failure: TransactionFailure) {
        tracing::warn!(component = "bulk", error = %failure, "batch abandoned");
    }

    /// Checked before each item with the number offered so far
    fn should_continue(&self, _processed: u64) -> bool {
        true
    }

    /// Called after each non-empty batch commits
    fn on_batch_committed(&mut self, _processed: u64) {}

    fn tx_options(&self) -> TxOptions {
        TxOptions::default()
    }
}

type Handler<'a, T> = Box<dyn FnMut(&GraphTx<'_>, &T) -> Result<()> + 'a>;
type Predicate<'a> = Box<dyn Fn(u64) -> bool + 'a>;

/// Adapter turning a closure into a [`BulkGraphOperation`]
///
/// ```
/// use trellis_store::bulk::ClosureOperation;
/// use trellis_store::TxOptions;
///
/// let op = ClosureOperation::new(|_tx, _item: &u32| Ok(()))
///     .with_options(TxOptions::default().with_notifications(false))
///     .with_predicate(|processed| processed < 10);
/// # let _ = op;
/// ```
pub struct ClosureOperation<'a, T> {
    handler: Handler<'a, T>,
    predicate: Option<Predicate<'a>>,
    options: TxOptions,
    escalate: bool,
    item_failures: Vec<ExError>,
    transaction_failures: Vec<TransactionFailure>,
}

impl<'a, T> ClosureOperation<'a, T> {
    pub fn new<F>(handler: F) -> Self
    where
        F: FnMut(&GraphTx<'_>, &T) -> Result<()> + 'a,
    {
        Self {
            handler: Box::new(handler),
            predicate: None,
            options: TxOptions::default(),
            escalate: false,
            item_failures: Vec::new(),
            transaction_failures: Vec::new(),
        }
    }

    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Fn(u64) -> bool + 'a,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    pub fn with_options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    /// Turn every item failure into a batch abort
    pub fn escalating(mut self) -> Self {
        self.escalate = true;
        self
    }

    pub fn item_failures(&self) -> &[ExError] {
        &self.item_failures
    }

    pub fn transaction_failures(&self) -> &[TransactionFailure] {
        &self.transaction_failures
    }
}

impl<T> BulkGraphOperation<T> for ClosureOperation<'_, T> {
    fn handle(&mut self, tx: &GraphTx<'_>, item: &T) -> Result<()> {
        (self.handler)(tx, item)
    }

    fn on_item_failure(&mut self, err: ExError, _item: &T) -> Result<()> {
        if self.escalate {
            return Err(err);
        }
        self.item_failures.push(err);
        Ok(())
    }

    fn on_transaction_failure(&mut self, failure: TransactionFailure) {
        self.transaction_failures.push(failure);
    }

    fn should_continue(&self, processed: u64) -> bool {
        self.predicate.as_ref().map_or(true, |p| p(processed))
    }

    fn tx_options(&self) -> TxOptions {
        self.options
    }
}
