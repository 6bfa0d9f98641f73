//! Registry of schema types
//!
//! A schema type is a named JSON definition. Entities whose `type` property
//! names a type must find it registered when validation is on.

use crate::errors::{from_rusqlite, serialization_error, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaType {
    pub name: String,
    pub definition: Value,
}

impl SchemaType {
    pub fn new(name: impl Into<String>, definition: Value) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }
}

pub fn upsert(conn: &Connection, schema_type: &SchemaType) -> Result<()> {
    let definition = serde_json::to_string(&schema_type.definition)
        .map_err(|e| serialization_error("upsert_schema_type", e))?;
    conn.execute(
        "INSERT INTO schema_types (name, definition, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(name) DO UPDATE SET
            definition = excluded.definition,
            updated_at = excluded.updated_at",
        params![
            schema_type.name,
            definition,
            chrono::Utc::now().timestamp_millis()
        ],
    )
    .map_err(from_rusqlite)?;
    Ok(())
}

pub fn exists(conn: &Connection, name: &str) -> Result<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM schema_types WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()
        .map_err(from_rusqlite)?;
    Ok(found.is_some())
}

/// All registered types sorted by name
pub fn list(conn: &Connection) -> Result<Vec<SchemaType>> {
    let mut stmt = conn
        .prepare("SELECT name, definition FROM schema_types ORDER BY name")
        .map_err(from_rusqlite)?;
    let types = stmt
        .query_map([], |row| {
            Ok(SchemaType {
                name: row.get(0)?,
                definition: row.get(1)?,
            })
        })
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(from_rusqlite)?;
    Ok(types)
}
