//! Structural validation applied when a scope has validation on

use crate::errors::{validation, Result};
use crate::repo::SqliteRepo;
use crate::schema_registry;
use rusqlite::Connection;
use std::collections::HashSet;
use trellis_core::errors::TrellisError;
use trellis_core::model::properties::keys;
use trellis_core::model::Entity;

pub fn check_entity(conn: &Connection, entity: &Entity) -> Result<()> {
    check_name(entity)?;
    check_parent(conn, entity)?;
    check_schema_type(conn, entity)
}

fn check_name(entity: &Entity) -> Result<()> {
    let name = entity.name.as_deref().map(str::trim).unwrap_or("");
    if entity.kind.requires_name() && name.is_empty() {
        return Err(TrellisError::InvalidName {
            kind: entity.kind.to_string(),
            reason: "name is required".to_string(),
        }
        .into());
    }
    if name.contains('/') {
        return Err(TrellisError::InvalidName {
            kind: entity.kind.to_string(),
            reason: format!("'{}' contains a path separator", name),
        }
        .into());
    }
    Ok(())
}

fn check_parent(conn: &Connection, entity: &Entity) -> Result<()> {
    let Some(parent_id) = entity.parent_id.as_deref() else {
        return Ok(());
    };

    if !entity.kind.is_hierarchical() {
        return Err(validation(
            "validate_parent",
            &entity.id,
            format!("{} entities cannot have a parent", entity.kind),
        ));
    }
    if parent_id == entity.id {
        return Err(cycle(entity, parent_id));
    }

    let parent = SqliteRepo::get_entity(conn, parent_id)?.ok_or_else(|| {
        TrellisError::ParentNotFound {
            entity_id: entity.id.clone(),
            parent_id: parent_id.to_string(),
        }
    })?;
    if parent.deleted {
        return Err(TrellisError::EntityDeleted {
            entity_id: parent.id,
        }
        .into());
    }
    if !parent.kind.accepts_child(entity.kind) {
        return Err(validation(
            "validate_parent",
            &entity.id,
            format!("{} cannot contain {}", parent.kind, entity.kind),
        ));
    }

    // Walk up from the new parent; reaching the entity itself means a cycle
    let mut seen = HashSet::new();
    let mut current = parent.parent_id;
    while let Some(id) = current {
        if id == entity.id {
            return Err(cycle(entity, parent_id));
        }
        if !seen.insert(id.clone()) {
            break;
        }
        current = SqliteRepo::get_entity(conn, &id)?.and_then(|e| e.parent_id);
    }
    Ok(())
}

fn check_schema_type(conn: &Connection, entity: &Entity) -> Result<()> {
    if let Some(type_name) = entity.properties.get_str(keys::TYPE) {
        if !schema_registry::exists(conn, type_name)? {
            return Err(TrellisError::UnknownSchemaType {
                entity_id: entity.id.clone(),
                type_name: type_name.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn cycle(entity: &Entity, parent_id: &str) -> trellis_core::ExError {
    TrellisError::CycleDetected {
        entity_id: entity.id.clone(),
        parent_id: parent_id.to_string(),
    }
    .into()
}
