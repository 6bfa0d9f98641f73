//! Configuration-script collaborator
//!
//! The scripting language is external. The importer hands the trimmed text
//! of the snapshot's configuration script to a [`ScriptEvaluator`] together
//! with an elevated execution context.

use trellis_core::errors::{ExError, ExErrorKind};
use trellis_core::ExecutionContext;

use crate::errors::Result;
use crate::graph::GraphTx;

pub trait ScriptEvaluator {
    /// Evaluate `source` inside `tx`
    ///
    /// # Errors
    ///
    /// Returns a `ScriptFailure` error when evaluation fails.
    fn evaluate(&self, tx: &GraphTx<'_>, ctx: &ExecutionContext, source: &str) -> Result<()>;
}

/// Runs the script as a batch of SQL statements against the store
///
/// Only the super-user context may run it; the statements bypass validation,
/// callbacks and notifications.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqlScriptEvaluator;

impl ScriptEvaluator for SqlScriptEvaluator {
    fn evaluate(&self, tx: &GraphTx<'_>, ctx: &ExecutionContext, source: &str) -> Result<()> {
        if !ctx.is_super_user() {
            return Err(ExError::new(ExErrorKind::ScriptFailure)
                .with_op("evaluate_script")
                .with_message("configuration scripts require the super-user context"));
        }
        tx.execute_batch(source).map_err(|e| {
            ExError::new(ExErrorKind::ScriptFailure)
                .with_op("evaluate_script")
                .with_message(e.to_string())
        })
    }
}
