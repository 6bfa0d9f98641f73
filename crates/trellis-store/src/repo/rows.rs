//! Row mapping between `entities` and the model

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::Row;
use serde_json::Value;
use trellis_core::model::{Entity, EntityKind, PropertyMap};

/// Column list matching [`entity_from_row`]
pub const ENTITY_COLUMNS: &str =
    "id, kind, name, parent_id, path, properties, content, deleted, created_at, updated_at";

/// One row of the change log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeRecord {
    pub seq: i64,
    pub entity_id: String,
    pub kind: String,
    pub change: String,
    pub at: i64,
}

pub fn entity_from_row(row: &Row<'_>) -> rusqlite::Result<Entity> {
    let kind_tag: String = row.get(1)?;
    let kind = kind_tag
        .parse::<EntityKind>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;

    let properties = match row.get::<_, Value>(5)? {
        Value::Object(map) => PropertyMap::from(map),
        _ => PropertyMap::new(),
    };

    Ok(Entity {
        id: row.get(0)?,
        kind,
        name: row.get(2)?,
        parent_id: row.get(3)?,
        path: row.get(4)?,
        properties,
        content: row.get(6)?,
        deleted: row.get::<_, i64>(7)? != 0,
        created_at: from_millis(row.get(8)?),
        updated_at: from_millis(row.get(9)?),
    })
}

pub fn change_from_row(row: &Row<'_>) -> rusqlite::Result<ChangeRecord> {
    Ok(ChangeRecord {
        seq: row.get(0)?,
        entity_id: row.get(1)?,
        kind: row.get(2)?,
        change: row.get(3)?,
        at: row.get(4)?,
    })
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp_millis(ms).unwrap_or_default()
}
