//! Repository layer mapping graph entities to SQLite rows
//!
//! Functions here are raw persistence: no validation, no derived paths, no
//! change notifications. `GraphTx` layers those on top.

pub mod rows;
pub mod sqlite_repo;

pub use rows::ChangeRecord;
pub use sqlite_repo::SqliteRepo;
