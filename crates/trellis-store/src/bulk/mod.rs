//! Batch transaction runner
//!
//! Applies long-running operations to large item sets in bounded commit
//! batches. Item failures go to the operation's handler instead of aborting
//! the batch; a failed batch is handed to the transaction-failure handler and
//! the run continues in a fresh scope.

pub mod maintenance;
pub mod operation;
pub mod runner;

pub use maintenance::{purge_trash, rebuild_paths, MaintenanceReport};
pub use operation::{BulkGraphOperation, ClosureOperation, TransactionFailure};
pub use runner::{bulk_graph_operation, bulk_transaction, BulkOutcome, OP_BULK};
