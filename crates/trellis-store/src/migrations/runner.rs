//! Applies embedded migrations in order, once each
//!
//! A migration that was already recorded is skipped, unless its recorded
//! checksum differs from the embedded SQL, which fails the open.

use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::{get_migrations, Migration};
use rusqlite::{params, Connection, OptionalExtension};

const LEDGER_DDL: &str = "CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    migration_id TEXT NOT NULL UNIQUE,
    applied_at INTEGER NOT NULL,
    checksum TEXT
)";

enum Recorded {
    Missing,
    Matches,
    Differs(String),
}

pub fn apply_migrations(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(LEDGER_DDL).map_err(from_rusqlite)?;

    for migration in get_migrations() {
        let checksum = compute_checksum(migration.sql);
        match lookup(conn, migration.id, &checksum)? {
            Recorded::Matches => {}
            Recorded::Differs(recorded) => {
                return Err(checksum_mismatch(migration.id, &recorded, &checksum))
            }
            Recorded::Missing => apply(conn, &migration, &checksum)?,
        }
    }
    Ok(())
}

/// Recorded migration ids, oldest first
pub fn applied_migrations(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT migration_id FROM schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let rows = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(from_rusqlite)?;
    let ids: Result<Vec<String>> = rows.map(|row| row.map_err(from_rusqlite)).collect();
    ids
}

fn lookup(conn: &Connection, id: &str, checksum: &str) -> Result<Recorded> {
    let row: Option<Option<String>> = conn
        .query_row(
            "SELECT checksum FROM schema_version WHERE migration_id = ?1",
            [id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    Ok(match row {
        None => Recorded::Missing,
        Some(Some(recorded)) if recorded != checksum => Recorded::Differs(recorded),
        Some(_) => Recorded::Matches,
    })
}

fn apply(conn: &mut Connection, migration: &Migration, checksum: &str) -> Result<()> {
    let tx = conn.transaction().map_err(from_rusqlite)?;
    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()))?;
    tx.execute(
        "INSERT INTO schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        params![migration.id, chrono::Utc::now().timestamp(), checksum],
    )
    .map_err(from_rusqlite)?;
    tx.commit().map_err(from_rusqlite)?;

    tracing::debug!(component = "migrations", migration_id = migration.id, "applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_core::ExErrorKind;

    #[test]
    fn test_second_run_is_a_no_op() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        apply_migrations(&mut conn).unwrap();
        assert_eq!(
            applied_migrations(&conn).unwrap(),
            vec!["001_graph_schema", "002_change_log"]
        );
    }

    #[test]
    fn test_edited_migration_refuses_to_open() {
        let mut conn = Connection::open_in_memory().unwrap();
        apply_migrations(&mut conn).unwrap();
        conn.execute(
            "UPDATE schema_version SET checksum = 'deadbeef' WHERE migration_id = '002_change_log'",
            [],
        )
        .unwrap();

        let err = apply_migrations(&mut conn).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Persistence);
        assert_eq!(err.op(), Some("migration_checksum"));
        assert_eq!(err.entity_id(), Some("002_change_log"));
    }
}
