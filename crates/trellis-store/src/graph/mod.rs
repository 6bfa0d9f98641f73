//! Graph store handle and transaction scopes
//!
//! Every mutation happens inside a [`GraphTx`]. Each scope carries three
//! independent toggles:
//! - `validation`: structural checks (names, parents, cycles, schema types)
//! - `callbacks`: derived path maintenance and timestamp stamping
//! - `notifications`: one change-log row per mutation

mod tx;
mod validate;

pub use tx::{GraphTx, REL_INCLUDES};

use crate::db;
use crate::errors::{from_rusqlite, Result};
use crate::migrations::apply_migrations;
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;

/// Behaviour toggles for one transaction scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TxOptions {
    pub validation: bool,
    pub callbacks: bool,
    pub notifications: bool,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            validation: true,
            callbacks: true,
            notifications: true,
        }
    }
}

impl TxOptions {
    /// All toggles off; used for reads and raw maintenance passes
    pub fn unchecked() -> Self {
        Self {
            validation: false,
            callbacks: false,
            notifications: false,
        }
    }

    pub fn with_validation(mut self, on: bool) -> Self {
        self.validation = on;
        self
    }

    pub fn with_callbacks(mut self, on: bool) -> Self {
        self.callbacks = on;
        self
    }

    pub fn with_notifications(mut self, on: bool) -> Self {
        self.notifications = on;
        self
    }
}

/// Owned connection to a migrated graph database
pub struct GraphDb {
    conn: Connection,
}

impl GraphDb {
    /// Open (creating if needed) and migrate the database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_connection(db::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(db::open_in_memory()?)
    }

    pub fn from_connection(mut conn: Connection) -> Result<Self> {
        db::configure(&conn)?;
        apply_migrations(&mut conn)?;
        Ok(Self { conn })
    }

    /// Open a write scope; it rolls back unless [`GraphTx::commit`] is called
    pub fn tx(&mut self, options: TxOptions) -> Result<GraphTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(from_rusqlite)?;
        Ok(GraphTx::new(tx, options))
    }

    /// Open a deferred scope for reading; never committed
    pub fn read_tx(&mut self) -> Result<GraphTx<'_>> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Deferred)
            .map_err(from_rusqlite)?;
        Ok(GraphTx::new(tx, TxOptions::unchecked()))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
