//! Trellis Store - SQLite graph store and bulk mutation engine
//!
//! Provides:
//! - SQLite schema with an embedded, checksummed migrations framework
//! - `GraphDb`/`GraphTx` transaction scopes with independent validation,
//!   callback and notification toggles
//! - Batch transaction runner driving `BulkGraphOperation` strategies
//! - Maintenance operations and the configuration-script collaborator

pub mod bulk;
pub mod db;
pub mod errors;
pub mod graph;
pub mod migrations;
pub mod repo;
pub mod schema_registry;
pub mod script;

// Re-export key types
pub use bulk::{
    bulk_graph_operation, bulk_transaction, BulkGraphOperation, BulkOutcome, ClosureOperation,
};
pub use errors::Result;
pub use graph::{GraphDb, GraphTx, TxOptions};
pub use schema_registry::SchemaType;
pub use script::{ScriptEvaluator, SqlScriptEvaluator};
