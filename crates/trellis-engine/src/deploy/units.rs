//! Reconstruction of discovered snapshot units
//!
//! One [`PhaseOperation`] drives a tree-walking import phase through the bulk
//! runner. Each discovered directory or file becomes a create or update of a
//! graph entity, configured from the phase manifest.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use std::fs;
use trellis_core::errors::{ExError, ExErrorKind};
use trellis_core::manifest::{NAME_KEY, SHARED_COMPONENTS_KEY};
use trellis_core::model::{is_identifier, Entity, EntityKind, PropertyMap};
use trellis_core::ConfigManifest;
use trellis_store::bulk::TransactionFailure;
use trellis_store::errors::{io_error, serialization_error};
use trellis_store::graph::REL_INCLUDES;
use trellis_store::{BulkGraphOperation, GraphTx, Result, SchemaType};

use super::layout::{COMPONENTS_DIR, CONTENT_EXTENSION, FILES_DIR, PAGES_DIR, SCHEMA_DIR, TEMPLATES_DIR};
use super::walk::{Discovered, UnitKind};

/// Tree-walking import phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImportPhase {
    Schema,
    Files,
    Templates,
    Components,
    Pages,
}

impl ImportPhase {
    /// Dependency order: referenced kinds exist before their referrers
    pub const ORDER: [ImportPhase; 5] = [
        ImportPhase::Schema,
        ImportPhase::Files,
        ImportPhase::Templates,
        ImportPhase::Components,
        ImportPhase::Pages,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImportPhase::Schema => "schema",
            ImportPhase::Files => "files",
            ImportPhase::Templates => "templates",
            ImportPhase::Components => "components",
            ImportPhase::Pages => "pages",
        }
    }

    /// Snapshot directory walked by this phase
    pub fn dir(&self) -> &'static str {
        match self {
            ImportPhase::Schema => SCHEMA_DIR,
            ImportPhase::Files => FILES_DIR,
            ImportPhase::Templates => TEMPLATES_DIR,
            ImportPhase::Components => COMPONENTS_DIR,
            ImportPhase::Pages => PAGES_DIR,
        }
    }
}

/// Bulk operation applying one phase's discovered units
pub struct PhaseOperation<'m> {
    phase: ImportPhase,
    manifest: &'m ConfigManifest,
    /// Imported folders: relative directory path to (id, graph path)
    folders: HashMap<String, (String, String)>,
    /// Entities already matched in this run, never matched twice
    claimed: HashSet<String>,
    pub created: u64,
    pub updated: u64,
    pub failures: Vec<ExError>,
    aborted: Option<ExError>,
}

impl<'m> PhaseOperation<'m> {
    pub fn new(phase: ImportPhase, manifest: &'m ConfigManifest) -> Self {
        Self {
            phase,
            manifest,
            folders: HashMap::new(),
            claimed: HashSet::new(),
            created: 0,
            updated: 0,
            failures: Vec::new(),
            aborted: None,
        }
    }

    /// The I/O error that ended the walk, if any
    pub fn take_abort(&mut self) -> Option<ExError> {
        self.aborted.take()
    }

    fn handle_tree_unit(&mut self, tx: &GraphTx<'_>, unit: &Discovered) -> Result<()> {
        let kind = match unit.kind {
            UnitKind::Dir => EntityKind::Folder,
            UnitKind::File => EntityKind::File,
        };
        let parent = match unit.parent_rel() {
            "" => None,
            rel => Some(self.folders.get(rel).cloned().ok_or_else(|| {
                ExError::new(ExErrorKind::UnresolvedReference)
                    .with_op("import_files")
                    .with_path(unit.rel_path.clone())
                    .with_message("containing folder was not imported")
            })?),
        };

        let config = self.manifest.get(&unit.rel_path).cloned().unwrap_or_default();
        let name = config
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .unwrap_or(unit.file_name())
            .to_string();
        let props = input_properties(kind, &config)?;
        let expected_path = match &parent {
            Some((_, parent_path)) => format!("{}/{}", parent_path, name),
            None => format!("/{}", name),
        };

        let mut entity = match self.unclaimed(tx.find_all_by_path(kind, &expected_path)?) {
            Some(existing) => existing,
            None => Entity::new(kind).named(name.clone()),
        };
        entity.name = Some(name);
        entity.parent_id = parent.map(|(id, _)| id);
        entity.properties.merge(&props);
        if kind == EntityKind::File {
            let bytes = fs::read(&unit.abs_path).map_err(|e| {
                io_error("import_files", e).with_path(unit.abs_path.display().to_string())
            })?;
            entity.content = Some(bytes);
        }

        self.save(tx, &mut entity)?;
        if kind == EntityKind::Folder {
            let graph_path = entity.path.clone().unwrap_or(expected_path);
            self.folders
                .insert(unit.rel_path.clone(), (entity.id.clone(), graph_path));
        }
        Ok(())
    }

    fn handle_dom_unit(
        &mut self,
        tx: &GraphTx<'_>,
        unit: &Discovered,
        kind: EntityKind,
    ) -> Result<()> {
        let Some(key) = unit.stem_if_ext(CONTENT_EXTENSION) else {
            return Ok(());
        };
        let config = self.manifest.get(key).cloned().unwrap_or_default();

        let shared = if kind == EntityKind::Page {
            self.resolve_components(tx, key, &config)?
        } else {
            Vec::new()
        };

        let name = config
            .get(NAME_KEY)
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| (!is_identifier(key)).then(|| key.to_string()));
        let props = input_properties(kind, &config)?;

        let existing = if is_identifier(key) {
            tx.get(key)?.filter(|e| e.kind == kind && !self.claimed.contains(&e.id))
        } else {
            self.find_named(tx, kind, key)?
        };
        let mut entity = match existing {
            Some(entity) => entity,
            None if is_identifier(key) => Entity::with_id(key.to_string(), kind),
            None => Entity::new(kind),
        };
        if name.is_some() {
            entity.name = name;
        }
        entity.properties.merge(&props);
        let bytes = fs::read(&unit.abs_path).map_err(|e| {
            io_error("import_content", e).with_path(unit.abs_path.display().to_string())
        })?;
        entity.content = Some(bytes);

        self.save(tx, &mut entity)?;
        if kind == EntityKind::Page {
            tx.set_references(&entity.id, REL_INCLUDES, &shared)?;
        }
        Ok(())
    }

    fn handle_schema_unit(&mut self, tx: &GraphTx<'_>, unit: &Discovered) -> Result<()> {
        let Some(stem) = unit.stem_if_ext("json") else {
            return Ok(());
        };
        let bytes = fs::read(&unit.abs_path).map_err(|e| {
            io_error("import_schema", e).with_path(unit.abs_path.display().to_string())
        })?;
        let document: Value =
            serde_json::from_slice(&bytes).map_err(|e| serialization_error("import_schema", e))?;

        match document.get("definitions").and_then(Value::as_object) {
            Some(definitions) => {
                for (name, definition) in definitions {
                    tx.upsert_schema_type(&SchemaType::new(name.clone(), definition.clone()))?;
                    self.created += 1;
                }
            }
            None => {
                tx.upsert_schema_type(&SchemaType::new(stem, document))?;
                self.created += 1;
            }
        }
        Ok(())
    }

    /// Identifiers of the components a page includes; all must already exist
    fn resolve_components(
        &self,
        tx: &GraphTx<'_>,
        page_key: &str,
        config: &Map<String, Value>,
    ) -> Result<Vec<String>> {
        let Some(keys) = config.get(SHARED_COMPONENTS_KEY).and_then(Value::as_array) else {
            return Ok(Vec::new());
        };
        let mut ids = Vec::with_capacity(keys.len());
        for key in keys.iter().filter_map(Value::as_str) {
            let found = if is_identifier(key) {
                tx.get(key)?.filter(|e| e.kind == EntityKind::Component)
            } else {
                tx.find_all_by_name(EntityKind::Component, key)?
                    .into_iter()
                    .find(Entity::is_top_level)
            };
            match found {
                Some(component) => ids.push(component.id),
                None => {
                    return Err(ExError::new(ExErrorKind::UnresolvedReference)
                        .with_op("import_pages")
                        .with_path(page_key.to_string())
                        .with_message(format!("shared component '{}' not found", key)))
                }
            }
        }
        Ok(ids)
    }

    fn find_named(&self, tx: &GraphTx<'_>, kind: EntityKind, name: &str) -> Result<Option<Entity>> {
        let candidates = tx.find_all_by_name(kind, name)?;
        let candidates = if kind == EntityKind::Component {
            candidates.into_iter().filter(Entity::is_top_level).collect()
        } else {
            candidates
        };
        Ok(self.unclaimed(candidates))
    }

    fn unclaimed(&self, candidates: Vec<Entity>) -> Option<Entity> {
        candidates
            .into_iter()
            .find(|e| !self.claimed.contains(&e.id))
    }

    fn save(&mut self, tx: &GraphTx<'_>, entity: &mut Entity) -> Result<()> {
        if tx.get(&entity.id)?.is_some() {
            tx.update(entity)?;
            self.updated += 1;
        } else {
            tx.create(entity)?;
            self.created += 1;
        }
        self.claimed.insert(entity.id.clone());
        Ok(())
    }
}

/// Manifest configuration minus manifest-only keys, converted for storage
fn input_properties(kind: EntityKind, config: &Map<String, Value>) -> Result<PropertyMap> {
    let mut input = config.clone();
    input.remove(NAME_KEY);
    input.remove(SHARED_COMPONENTS_KEY);
    Ok(PropertyMap::from_input(kind, &input)?)
}

impl BulkGraphOperation<Discovered> for PhaseOperation<'_> {
    fn handle(&mut self, tx: &GraphTx<'_>, unit: &Discovered) -> Result<()> {
        match self.phase {
            ImportPhase::Schema => self.handle_schema_unit(tx, unit),
            ImportPhase::Files => self.handle_tree_unit(tx, unit),
            ImportPhase::Templates => match unit.kind {
                UnitKind::File => self.handle_dom_unit(tx, unit, EntityKind::Template),
                UnitKind::Dir => Ok(()),
            },
            ImportPhase::Components => match unit.kind {
                UnitKind::File => self.handle_dom_unit(tx, unit, EntityKind::Component),
                UnitKind::Dir => Ok(()),
            },
            ImportPhase::Pages => match unit.kind {
                UnitKind::File => self.handle_dom_unit(tx, unit, EntityKind::Page),
                UnitKind::Dir => Ok(()),
            },
        }
    }

    fn on_item_failure(&mut self, err: ExError, unit: &Discovered) -> Result<()> {
        if err.kind() == ExErrorKind::Io {
            tracing::warn!(
                component = "deploy",
                phase = self.phase.as_str(),
                path = %unit.rel_path,
                error = %err,
                "I/O failure, abandoning walk"
            );
            self.aborted = Some(err);
        } else {
            tracing::warn!(
                component = "deploy",
                phase = self.phase.as_str(),
                path = %unit.rel_path,
                error = %err,
                "unit not imported"
            );
            self.failures.push(err);
        }
        Ok(())
    }

    fn on_transaction_failure(&mut self, failure: TransactionFailure) {
        tracing::warn!(component = "deploy", phase = self.phase.as_str(), error = %failure, "import batch rolled back");
        self.failures.push(failure.error().clone());
    }

    fn should_continue(&self, _processed: u64) -> bool {
        self.aborted.is_none()
    }
}
