use chrono::Utc;
use rusqlite::Transaction;
use std::collections::HashSet;
use trellis_core::errors::{ExError, ExErrorKind, TrellisError};
use trellis_core::model::{Entity, EntityKind};

use super::validate;
use super::TxOptions;
use crate::errors::{from_rusqlite, Result};
use crate::repo::{ChangeRecord, SqliteRepo};
use crate::schema_registry::{self, SchemaType};

/// Relation used for page → shared component references
pub const REL_INCLUDES: &str = "includes";

const CHANGE_CREATE: &str = "create";
const CHANGE_UPDATE: &str = "update";
const CHANGE_TRASH: &str = "trash";
const CHANGE_DELETE: &str = "delete";

/// A transaction scope over the graph
///
/// Dropping the scope without calling [`GraphTx::commit`] rolls back every
/// mutation made through it.
pub struct GraphTx<'conn> {
    tx: Transaction<'conn>,
    options: TxOptions,
}

impl<'conn> GraphTx<'conn> {
    pub(crate) fn new(tx: Transaction<'conn>, options: TxOptions) -> Self {
        Self { tx, options }
    }

    pub fn options(&self) -> TxOptions {
        self.options
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit().map_err(from_rusqlite)
    }

    // ---- mutation ----

    /// Insert a new entity
    ///
    /// With callbacks on, the derived path and timestamps are written back
    /// into `entity`.
    pub fn create(&self, entity: &mut Entity) -> Result<()> {
        if SqliteRepo::exists(&self.tx, &entity.id)? {
            return Err(ExError::new(ExErrorKind::AlreadyExists)
                .with_op("create")
                .with_entity_id(entity.id.clone())
                .with_message("Entity already exists"));
        }
        if self.options.validation {
            validate::check_entity(&self.tx, entity)?;
        }
        if self.options.callbacks {
            let now = Utc::now();
            entity.created_at = now;
            entity.updated_at = now;
            entity.path = self.derive_path(entity)?;
        }
        SqliteRepo::insert_entity(&self.tx, entity)?;
        self.notify(&entity.id, entity.kind, CHANGE_CREATE)
    }

    /// Persist changes to an existing entity
    ///
    /// With callbacks on, a rename or move also re-derives the paths of the
    /// whole subtree.
    pub fn update(&self, entity: &mut Entity) -> Result<()> {
        let previous = self.require(&entity.id)?;
        if self.options.validation {
            validate::check_entity(&self.tx, entity)?;
        }
        if self.options.callbacks {
            entity.updated_at = Utc::now();
            entity.path = self.derive_path(entity)?;
        }
        SqliteRepo::update_entity(&self.tx, entity)?;
        if self.options.callbacks && previous.path != entity.path {
            self.refresh_subtree_paths(&entity.id)?;
        }
        self.notify(&entity.id, entity.kind, CHANGE_UPDATE)
    }

    /// Move an entity and its descendants to trash
    pub fn soft_delete(&self, id: &str) -> Result<()> {
        let now = Utc::now().timestamp_millis();
        for entity in self.subtree(id)? {
            SqliteRepo::set_deleted(&self.tx, &entity.id, true, now)?;
            self.notify(&entity.id, entity.kind, CHANGE_TRASH)?;
        }
        Ok(())
    }

    /// Physically remove an entity, its descendants and their references
    ///
    /// Returns the number of entities removed.
    pub fn delete(&self, id: &str) -> Result<usize> {
        let subtree = self.subtree(id)?;
        // Leaves first so no row is left pointing at a removed parent
        for entity in subtree.iter().rev() {
            SqliteRepo::delete_entity(&self.tx, &entity.id)?;
            self.notify(&entity.id, entity.kind, CHANGE_DELETE)?;
        }
        Ok(subtree.len())
    }

    /// Remove every entity of `kind` with its descendants; returns how many rows went
    pub fn delete_all_of_kind(&self, kind: EntityKind) -> Result<usize> {
        let mut removed = 0;
        for id in SqliteRepo::ids_of_kind(&self.tx, kind)? {
            if SqliteRepo::exists(&self.tx, &id)? {
                removed += self.delete(&id)?;
            }
        }
        Ok(removed)
    }

    pub fn add_reference(&self, source_id: &str, target_id: &str, rel: &str) -> Result<()> {
        if self.options.validation {
            self.require(source_id)?;
            self.require(target_id)?;
        }
        SqliteRepo::insert_ref(&self.tx, source_id, target_id, rel)
    }

    /// Replace all `rel` references of `source_id`
    pub fn set_references(&self, source_id: &str, rel: &str, target_ids: &[String]) -> Result<()> {
        SqliteRepo::clear_refs(&self.tx, source_id, rel)?;
        for target in target_ids {
            self.add_reference(source_id, target, rel)?;
        }
        Ok(())
    }

    pub fn upsert_schema_type(&self, schema_type: &SchemaType) -> Result<()> {
        schema_registry::upsert(&self.tx, schema_type)
    }

    /// Overwrite the stored path without touching anything else
    pub fn set_path(&self, id: &str, path: Option<&str>) -> Result<()> {
        SqliteRepo::set_path(&self.tx, id, path)
    }

    pub(crate) fn execute_batch(&self, sql: &str) -> rusqlite::Result<()> {
        self.tx.execute_batch(sql)
    }

    // ---- queries ----

    pub fn get(&self, id: &str) -> Result<Option<Entity>> {
        SqliteRepo::get_entity(&self.tx, id)
    }

    pub fn require(&self, id: &str) -> Result<Entity> {
        self.get(id)?.ok_or_else(|| {
            TrellisError::EntityNotFound {
                entity_id: id.to_string(),
            }
            .into()
        })
    }

    /// First live entity of `kind` at `path`
    pub fn find_by_path(&self, kind: EntityKind, path: &str) -> Result<Option<Entity>> {
        Ok(SqliteRepo::by_path(&self.tx, kind, path)?.into_iter().next())
    }

    /// Every live entity of `kind` at `path`, oldest first
    pub fn find_all_by_path(&self, kind: EntityKind, path: &str) -> Result<Vec<Entity>> {
        SqliteRepo::by_path(&self.tx, kind, path)
    }

    pub fn find_by_name(&self, kind: EntityKind, name: &str) -> Result<Option<Entity>> {
        Ok(SqliteRepo::by_name(&self.tx, kind, name)?.into_iter().next())
    }

    pub fn find_all_by_name(&self, kind: EntityKind, name: &str) -> Result<Vec<Entity>> {
        SqliteRepo::by_name(&self.tx, kind, name)
    }

    /// Children ordered by `position`, then name
    pub fn children(&self, parent_id: &str) -> Result<Vec<Entity>> {
        SqliteRepo::children(&self.tx, parent_id)
    }

    pub fn top_level(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        SqliteRepo::top_level(&self.tx, kind)
    }

    pub fn all_of_kind(&self, kind: EntityKind) -> Result<Vec<Entity>> {
        SqliteRepo::all_of_kind(&self.tx, kind)
    }

    pub fn all_ids(&self) -> Result<Vec<String>> {
        SqliteRepo::all_ids(&self.tx)
    }

    pub fn trashed_ids(&self) -> Result<Vec<String>> {
        SqliteRepo::trashed_ids(&self.tx)
    }

    pub fn references(&self, source_id: &str, rel: &str) -> Result<Vec<String>> {
        SqliteRepo::refs_from(&self.tx, source_id, rel)
    }

    pub fn schema_types(&self) -> Result<Vec<SchemaType>> {
        schema_registry::list(&self.tx)
    }

    pub fn changes_since(&self, seq: i64) -> Result<Vec<ChangeRecord>> {
        SqliteRepo::changes_since(&self.tx, seq)
    }

    /// `/a/b/c` path built from the display names along the parent chain
    ///
    /// Flat kinds have no path. A missing ancestor ends the walk.
    pub fn derive_path(&self, entity: &Entity) -> Result<Option<String>> {
        if !entity.kind.is_hierarchical() {
            return Ok(None);
        }
        let mut segments = vec![entity.display_name().to_string()];
        let mut seen = HashSet::new();
        let mut current = entity.parent_id.clone();
        while let Some(id) = current {
            if !seen.insert(id.clone()) {
                break;
            }
            match self.get(&id)? {
                Some(parent) => {
                    segments.push(parent.display_name().to_string());
                    current = parent.parent_id;
                }
                None => break,
            }
        }
        segments.reverse();
        Ok(Some(format!("/{}", segments.join("/"))))
    }

    // ---- internals ----

    /// The entity followed by its descendants, parents before children
    fn subtree(&self, id: &str) -> Result<Vec<Entity>> {
        let root = self.require(id)?;
        let mut seen = HashSet::from([root.id.clone()]);
        let mut out = vec![root];
        let mut i = 0;
        while i < out.len() {
            let parent_id = out[i].id.clone();
            for child_id in SqliteRepo::child_ids(&self.tx, &parent_id)? {
                if !seen.insert(child_id.clone()) {
                    continue;
                }
                if let Some(child) = self.get(&child_id)? {
                    out.push(child);
                }
            }
            i += 1;
        }
        Ok(out)
    }

    fn refresh_subtree_paths(&self, id: &str) -> Result<()> {
        for entity in self.subtree(id)?.into_iter().skip(1) {
            let path = self.derive_path(&entity)?;
            SqliteRepo::set_path(&self.tx, &entity.id, path.as_deref())?;
        }
        Ok(())
    }

    fn notify(&self, entity_id: &str, kind: EntityKind, change: &str) -> Result<()> {
        if !self.options.notifications {
            return Ok(());
        }
        SqliteRepo::log_change(
            &self.tx,
            entity_id,
            kind,
            change,
            Utc::now().timestamp_millis(),
        )
    }
}
