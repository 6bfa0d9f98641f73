//! SQLite repository for graph entities, references and the change log

use crate::errors::{from_rusqlite, serialization_error, Result};
use crate::repo::rows::{change_from_row, entity_from_row, ChangeRecord, ENTITY_COLUMNS};
use rusqlite::{params, Connection, OptionalExtension, Params};
use trellis_core::model::{Entity, EntityKind};

/// Ordering applied to sibling lists: explicit position first, then name
const SIBLING_ORDER: &str =
    "ORDER BY COALESCE(json_extract(properties, '$.position'), 0), name, created_at, id";

/// Stateless repository; every function takes the connection or transaction
pub struct SqliteRepo;

impl SqliteRepo {
    pub fn insert_entity(conn: &Connection, entity: &Entity) -> Result<()> {
        let properties = serde_json::to_string(entity.properties.as_map())
            .map_err(|e| serialization_error("insert_entity", e))?;
        conn.execute(
            "INSERT INTO entities (id, kind, name, parent_id, path, properties, content, deleted, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                entity.id,
                entity.kind.as_str(),
                entity.name,
                entity.parent_id,
                entity.path,
                properties,
                entity.content,
                if entity.deleted { 1 } else { 0 },
                entity.created_at.timestamp_millis(),
                entity.updated_at.timestamp_millis(),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn update_entity(conn: &Connection, entity: &Entity) -> Result<()> {
        let properties = serde_json::to_string(entity.properties.as_map())
            .map_err(|e| serialization_error("update_entity", e))?;
        conn.execute(
            "UPDATE entities SET
                name = ?2,
                parent_id = ?3,
                path = ?4,
                properties = ?5,
                content = ?6,
                deleted = ?7,
                updated_at = ?8
             WHERE id = ?1",
            params![
                entity.id,
                entity.name,
                entity.parent_id,
                entity.path,
                properties,
                entity.content,
                if entity.deleted { 1 } else { 0 },
                entity.updated_at.timestamp_millis(),
            ],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn get_entity(conn: &Connection, id: &str) -> Result<Option<Entity>> {
        conn.query_row(
            &format!("SELECT {} FROM entities WHERE id = ?1", ENTITY_COLUMNS),
            [id],
            entity_from_row,
        )
        .optional()
        .map_err(from_rusqlite)
    }

    pub fn exists(conn: &Connection, id: &str) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM entities WHERE id = ?1", [id], |row| row.get(0))
            .optional()
            .map_err(from_rusqlite)?;
        Ok(found.is_some())
    }

    /// Run `SELECT <columns> FROM entities <clause>` and map every row
    pub fn query_entities<P: Params>(conn: &Connection, clause: &str, params: P) -> Result<Vec<Entity>> {
        let sql = format!("SELECT {} FROM entities {}", ENTITY_COLUMNS, clause);
        let mut stmt = conn.prepare(&sql).map_err(from_rusqlite)?;
        let entities = stmt
            .query_map(params, entity_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(entities)
    }

    pub fn children(conn: &Connection, parent_id: &str) -> Result<Vec<Entity>> {
        Self::query_entities(
            conn,
            &format!("WHERE parent_id = ?1 {}", SIBLING_ORDER),
            [parent_id],
        )
    }

    pub fn top_level(conn: &Connection, kind: EntityKind) -> Result<Vec<Entity>> {
        Self::query_entities(
            conn,
            &format!("WHERE kind = ?1 AND parent_id IS NULL {}", SIBLING_ORDER),
            [kind.as_str()],
        )
    }

    pub fn all_of_kind(conn: &Connection, kind: EntityKind) -> Result<Vec<Entity>> {
        Self::query_entities(
            conn,
            "WHERE kind = ?1 ORDER BY path, name, created_at, id",
            [kind.as_str()],
        )
    }

    pub fn by_path(conn: &Connection, kind: EntityKind, path: &str) -> Result<Vec<Entity>> {
        Self::query_entities(
            conn,
            "WHERE kind = ?1 AND path = ?2 AND deleted = 0 ORDER BY created_at, id",
            params![kind.as_str(), path],
        )
    }

    pub fn by_name(conn: &Connection, kind: EntityKind, name: &str) -> Result<Vec<Entity>> {
        Self::query_entities(
            conn,
            "WHERE kind = ?1 AND name = ?2 AND deleted = 0 ORDER BY created_at, id",
            params![kind.as_str(), name],
        )
    }

    pub fn ids_of_kind(conn: &Connection, kind: EntityKind) -> Result<Vec<String>> {
        Self::query_ids(conn, "SELECT id FROM entities WHERE kind = ?1 ORDER BY id", [kind.as_str()])
    }

    pub fn all_ids(conn: &Connection) -> Result<Vec<String>> {
        Self::query_ids(conn, "SELECT id FROM entities ORDER BY id", [])
    }

    pub fn trashed_ids(conn: &Connection) -> Result<Vec<String>> {
        Self::query_ids(conn, "SELECT id FROM entities WHERE deleted = 1 ORDER BY id", [])
    }

    pub fn child_ids(conn: &Connection, parent_id: &str) -> Result<Vec<String>> {
        Self::query_ids(
            conn,
            "SELECT id FROM entities WHERE parent_id = ?1 ORDER BY id",
            [parent_id],
        )
    }

    fn query_ids<P: Params>(conn: &Connection, sql: &str, params: P) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(sql).map_err(from_rusqlite)?;
        let ids = stmt
            .query_map(params, |row| row.get(0))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<String>, _>>()
            .map_err(from_rusqlite)?;
        Ok(ids)
    }

    pub fn set_path(conn: &Connection, id: &str, path: Option<&str>) -> Result<()> {
        conn.execute("UPDATE entities SET path = ?2 WHERE id = ?1", params![id, path])
            .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn set_deleted(conn: &Connection, id: &str, deleted: bool, at_millis: i64) -> Result<()> {
        conn.execute(
            "UPDATE entities SET deleted = ?2, updated_at = ?3 WHERE id = ?1",
            params![id, if deleted { 1 } else { 0 }, at_millis],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn delete_entity(conn: &Connection, id: &str) -> Result<bool> {
        let n = conn
            .execute("DELETE FROM entities WHERE id = ?1", [id])
            .map_err(from_rusqlite)?;
        Ok(n > 0)
    }

    pub fn insert_ref(conn: &Connection, source_id: &str, target_id: &str, rel: &str) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO entity_refs (source_id, target_id, rel) VALUES (?1, ?2, ?3)",
            params![source_id, target_id, rel],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    /// Targets referenced from `source_id` under `rel`, in insertion order
    pub fn refs_from(conn: &Connection, source_id: &str, rel: &str) -> Result<Vec<String>> {
        Self::query_ids(
            conn,
            "SELECT target_id FROM entity_refs WHERE source_id = ?1 AND rel = ?2 ORDER BY rowid",
            params![source_id, rel],
        )
    }

    pub fn clear_refs(conn: &Connection, source_id: &str, rel: &str) -> Result<()> {
        conn.execute(
            "DELETE FROM entity_refs WHERE source_id = ?1 AND rel = ?2",
            params![source_id, rel],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn log_change(
        conn: &Connection,
        entity_id: &str,
        kind: EntityKind,
        change: &str,
        at_millis: i64,
    ) -> Result<()> {
        conn.execute(
            "INSERT INTO change_log (entity_id, kind, change, at) VALUES (?1, ?2, ?3, ?4)",
            params![entity_id, kind.as_str(), change, at_millis],
        )
        .map_err(from_rusqlite)?;
        Ok(())
    }

    pub fn changes_since(conn: &Connection, seq: i64) -> Result<Vec<ChangeRecord>> {
        let mut stmt = conn
            .prepare("SELECT seq, entity_id, kind, change, at FROM change_log WHERE seq > ?1 ORDER BY seq")
            .map_err(from_rusqlite)?;
        let changes = stmt
            .query_map([seq], change_from_row)
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(from_rusqlite)?;
        Ok(changes)
    }
}
