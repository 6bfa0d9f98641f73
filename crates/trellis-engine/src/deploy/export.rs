//! Snapshot export
//!
//! Each category is written from its own read transaction. A failing category
//! is logged and recorded in the report; the remaining categories still run.

use serde_json::{json, Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use trellis_core::errors::ExError;
use trellis_core::manifest::{
    dom_configuration, file_configuration, grants_to_pretty_bytes, GrantRecord, NAME_KEY,
    SHARED_COMPONENTS_KEY,
};
use trellis_core::model::{Entity, EntityKind};
use trellis_core::render::{Renderer, StoredContentRenderer};
use trellis_core::{log_op_end, log_op_error, log_op_start, ConfigManifest};
use trellis_core_types::RunId;
use trellis_store::errors::{io_error, precondition, serialization_error};
use trellis_store::graph::REL_INCLUDES;
use trellis_store::{GraphDb, GraphTx, Result};

use super::fsutil::{atomic_write, free_path};
use super::layout::*;

const OP_EXPORT: &str = "snapshot_export";

/// Identifier of the generated schema document
pub const SCHEMA_DOCUMENT_ID: &str = "trellis:schema";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportCategory {
    Files,
    Pages,
    Components,
    Templates,
    Grants,
    Schema,
}

impl ExportCategory {
    pub const ALL: [ExportCategory; 6] = [
        ExportCategory::Files,
        ExportCategory::Pages,
        ExportCategory::Components,
        ExportCategory::Templates,
        ExportCategory::Grants,
        ExportCategory::Schema,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportCategory::Files => "files",
            ExportCategory::Pages => "pages",
            ExportCategory::Components => "components",
            ExportCategory::Templates => "templates",
            ExportCategory::Grants => "grants",
            ExportCategory::Schema => "schema",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CategoryReport {
    pub category: ExportCategory,
    /// Manifest entries (or records) written
    pub written: usize,
    pub failure: Option<ExError>,
}

#[derive(Debug, Clone)]
pub struct ExportReport {
    pub run_id: RunId,
    pub categories: Vec<CategoryReport>,
}

impl ExportReport {
    pub fn category(&self, category: ExportCategory) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn is_complete(&self) -> bool {
        self.categories.iter().all(|c| c.failure.is_none())
    }
}

/// Writes the exportable state of a graph into a snapshot directory
pub struct SnapshotExporter {
    renderer: Box<dyn Renderer>,
}

impl Default for SnapshotExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotExporter {
    pub fn new() -> Self {
        Self {
            renderer: Box::new(StoredContentRenderer),
        }
    }

    pub fn with_renderer(renderer: Box<dyn Renderer>) -> Self {
        Self { renderer }
    }

    /// Export the graph into `target`, which must not exist yet
    ///
    /// # Errors
    ///
    /// Returns `PreconditionFailed` for an empty or existing target, or when
    /// the snapshot directories cannot be created. Category failures are
    /// reported, not returned.
    pub fn export(&self, db: &mut GraphDb, target: &Path) -> Result<ExportReport> {
        let target_display = target.display().to_string();
        log_op_start!(OP_EXPORT, target = %target_display);
        let start = Instant::now();

        prepare_target(target).map_err(|e| {
            log_op_error!(OP_EXPORT, e.clone(), duration_ms = start.elapsed().as_millis() as u64);
            e
        })?;

        let run_id = RunId::new();
        let mut categories = Vec::with_capacity(ExportCategory::ALL.len());
        for category in ExportCategory::ALL {
            let result = match db.read_tx() {
                Ok(tx) => self.export_category(&tx, category, target),
                Err(e) => Err(e),
            };
            let report = match result {
                Ok(written) => CategoryReport {
                    category,
                    written,
                    failure: None,
                },
                Err(e) => {
                    tracing::warn!(
                        component = "deploy",
                        op = OP_EXPORT,
                        run_id = %run_id,
                        category = category.as_str(),
                        error = %e,
                        "export category failed, continuing"
                    );
                    CategoryReport {
                        category,
                        written: 0,
                        failure: Some(e),
                    }
                }
            };
            categories.push(report);
        }

        log_op_end!(
            OP_EXPORT,
            duration_ms = start.elapsed().as_millis() as u64,
            run_id = %run_id
        );
        Ok(ExportReport { run_id, categories })
    }

    fn export_category(
        &self,
        tx: &GraphTx<'_>,
        category: ExportCategory,
        root: &Path,
    ) -> Result<usize> {
        match category {
            ExportCategory::Files => export_files(tx, root),
            ExportCategory::Pages => self.export_pages(tx, root),
            ExportCategory::Components => self.export_dom(
                live(tx.top_level(EntityKind::Component)?),
                root.join(COMPONENTS_DIR),
                root.join(COMPONENTS_MANIFEST),
            ),
            ExportCategory::Templates => self.export_dom(
                live(tx.all_of_kind(EntityKind::Template)?),
                root.join(TEMPLATES_DIR),
                root.join(TEMPLATES_MANIFEST),
            ),
            ExportCategory::Grants => export_grants(tx, root),
            ExportCategory::Schema => export_schema(tx, root),
        }
    }

    fn export_pages(&self, tx: &GraphTx<'_>, root: &Path) -> Result<usize> {
        let dir = root.join(PAGES_DIR);
        let components = component_keys(tx)?;
        let mut manifest = ConfigManifest::new();

        for page in live(tx.all_of_kind(EntityKind::Page)?) {
            let text = match self.renderer.render_deployment(&page) {
                Ok(Some(text)) => text,
                Ok(None) => continue,
                Err(e) => {
                    tracing::warn!(component = "deploy", entity_id = %page.id, error = %e, "page render failed, skipped");
                    continue;
                }
            };

            let key = manifest_key(&manifest, &page);
            let mut config = keyed_configuration(&page, &key, dom_configuration(&page));
            let shared: Vec<Value> = tx
                .references(&page.id, REL_INCLUDES)?
                .into_iter()
                .filter_map(|id| match components.get(&id) {
                    Some(key) => Some(Value::String(key.clone())),
                    None => {
                        tracing::warn!(component = "deploy", page_id = %page.id, component_id = %id, "included component not exported");
                        None
                    }
                })
                .collect();
            if !shared.is_empty() {
                config.insert(SHARED_COMPONENTS_KEY.to_string(), Value::Array(shared));
            }

            atomic_write(&dir.join(content_file_name(&key)), text.as_bytes())?;
            record_config(&mut manifest, key, config);
        }

        let written = manifest.len();
        atomic_write(&root.join(PAGES_MANIFEST), &manifest.to_pretty_bytes()?)?;
        Ok(written)
    }

    /// Components and templates: flat directory of rendered text plus manifest
    fn export_dom(
        &self,
        entities: Vec<Entity>,
        dir: PathBuf,
        manifest_path: PathBuf,
    ) -> Result<usize> {
        let mut manifest = ConfigManifest::new();
        for entity in entities {
            let text = match self.renderer.render_deployment(&entity) {
                Ok(text) => text.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(component = "deploy", entity_id = %entity.id, error = %e, "render failed, skipped");
                    continue;
                }
            };
            let key = manifest_key(&manifest, &entity);
            let config = keyed_configuration(&entity, &key, dom_configuration(&entity));
            atomic_write(&dir.join(content_file_name(&key)), text.as_bytes())?;
            record_config(&mut manifest, key, config);
        }
        let written = manifest.len();
        atomic_write(&manifest_path, &manifest.to_pretty_bytes()?)?;
        Ok(written)
    }
}

fn prepare_target(target: &Path) -> Result<()> {
    let shown = target.display().to_string();
    if shown.trim().is_empty() {
        return Err(precondition(OP_EXPORT, &shown, "target path is empty"));
    }
    if target.exists() {
        return Err(precondition(OP_EXPORT, &shown, "target already exists"));
    }
    for dir in EXPORT_DIRS {
        fs::create_dir_all(target.join(dir)).map_err(|e| {
            precondition(OP_EXPORT, &shown, "could not create snapshot directories")
                .with_source(io_error("create_snapshot_dir", e))
        })?;
    }
    Ok(())
}

fn live(entities: Vec<Entity>) -> Vec<Entity> {
    entities.into_iter().filter(|e| !e.in_trash()).collect()
}

/// Display name, or the identifier once the display name is taken
fn manifest_key(manifest: &ConfigManifest, entity: &Entity) -> String {
    let name = entity.display_name();
    if manifest.contains_key(name) {
        entity.id.clone()
    } else {
        name.to_string()
    }
}

/// Record the real name when the key does not carry it
fn keyed_configuration(
    entity: &Entity,
    key: &str,
    mut config: Map<String, Value>,
) -> Map<String, Value> {
    if let Some(name) = entity.name.as_deref() {
        if !name.is_empty() && name != key {
            config.insert(NAME_KEY.to_string(), Value::String(name.to_string()));
        }
    }
    config
}

/// Manifest keys of exported components by identifier
fn component_keys(tx: &GraphTx<'_>) -> Result<HashMap<String, String>> {
    let mut taken = ConfigManifest::new();
    let mut keys = HashMap::new();
    for component in live(tx.top_level(EntityKind::Component)?) {
        let key = manifest_key(&taken, &component);
        taken.insert(key.clone(), Map::new());
        keys.insert(component.id, key);
    }
    Ok(keys)
}

fn export_files(tx: &GraphTx<'_>, root: &Path) -> Result<usize> {
    let dir = root.join(FILES_DIR);
    let mut manifest = ConfigManifest::new();
    for folder in live(tx.top_level(EntityKind::Folder)?) {
        export_folder(tx, &folder, &dir, "", &mut manifest)?;
    }
    for file in live(tx.top_level(EntityKind::File)?) {
        export_file(&file, &dir, "", &mut manifest)?;
    }
    let written = manifest.len();
    atomic_write(&root.join(FILES_MANIFEST), &manifest.to_pretty_bytes()?)?;
    Ok(written)
}

fn export_folder(
    tx: &GraphTx<'_>,
    folder: &Entity,
    dir: &Path,
    rel_parent: &str,
    manifest: &mut ConfigManifest,
) -> Result<()> {
    let name = folder.display_name();
    let (disk_name, folder_dir) = free_path(dir, name);
    fs::create_dir(&folder_dir)
        .map_err(|e| io_error("export_folder", e).with_path(folder_dir.display().to_string()))?;
    let rel = format!("{}/{}", rel_parent, disk_name);

    let mut config = file_configuration(folder);
    if disk_name != name {
        config.insert(NAME_KEY.to_string(), Value::String(name.to_string()));
    }
    if !config.is_empty() {
        record_config(manifest, rel.clone(), config);
    }

    for child in live(tx.children(&folder.id)?) {
        match child.kind {
            EntityKind::Folder => export_folder(tx, &child, &folder_dir, &rel, manifest)?,
            EntityKind::File => export_file(&child, &folder_dir, &rel, manifest)?,
            _ => {}
        }
    }
    Ok(())
}

fn export_file(
    file: &Entity,
    dir: &Path,
    rel_parent: &str,
    manifest: &mut ConfigManifest,
) -> Result<()> {
    let name = file.display_name();
    let (disk_name, path) = free_path(dir, name);
    atomic_write(&path, file.content.as_deref().unwrap_or_default())?;

    let mut config = file_configuration(file);
    if disk_name != name {
        config.insert(NAME_KEY.to_string(), Value::String(name.to_string()));
    }
    if !config.is_empty() {
        record_config(manifest, format!("{}/{}", rel_parent, disk_name), config);
    }
    Ok(())
}

/// Insert an entry, warning when the key is already taken
fn record_config(
    manifest: &mut ConfigManifest,
    key: String,
    config: Map<String, Value>,
) -> bool {
    if manifest.insert(key.clone(), config) {
        return true;
    }
    tracing::warn!(
        component = "deploy",
        op = OP_EXPORT,
        key = %key,
        "manifest key already taken, configuration dropped"
    );
    false
}

fn export_grants(tx: &GraphTx<'_>, root: &Path) -> Result<usize> {
    let grants: Vec<GrantRecord> = live(tx.all_of_kind(EntityKind::ResourceAccess)?)
        .iter()
        .filter_map(GrantRecord::from_entity)
        .collect();
    atomic_write(&root.join(GRANTS_MANIFEST), &grants_to_pretty_bytes(&grants)?)?;
    Ok(grants.len())
}

/// Structural description: property keys and counts per kind, plus registered types
fn schema_document(tx: &GraphTx<'_>) -> Result<Value> {
    let mut kinds = Map::new();
    for kind in EntityKind::ALL {
        let entities = tx.all_of_kind(kind)?;
        if entities.is_empty() {
            continue;
        }
        let properties: BTreeSet<&String> =
            entities.iter().flat_map(|e| e.properties.keys()).collect();
        kinds.insert(
            kind.as_str().to_string(),
            json!({ "count": entities.len(), "properties": properties }),
        );
    }

    let mut definitions = Map::new();
    for schema_type in tx.schema_types()? {
        definitions.insert(schema_type.name, schema_type.definition);
    }

    Ok(json!({
        "id": SCHEMA_DOCUMENT_ID,
        "kinds": kinds,
        "definitions": definitions,
    }))
}

fn export_schema(tx: &GraphTx<'_>, root: &Path) -> Result<usize> {
    let document = schema_document(tx)?;
    let written = document["definitions"].as_object().map_or(0, Map::len);
    let bytes = serde_json::to_vec_pretty(&document)
        .map_err(|e| serialization_error("export_schema", e))?;
    atomic_write(&root.join(SCHEMA_DOCUMENT), &bytes)?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trellis_store::TxOptions;

    #[test]
    fn test_manifest_key_falls_back_to_id() {
        let mut manifest = ConfigManifest::new();
        let first = Entity::new(EntityKind::Page).named("home");
        let second = Entity::new(EntityKind::Page).named("home");
        let key = manifest_key(&manifest, &first);
        manifest.insert(key.clone(), Map::new());
        assert_eq!(key, "home");
        assert_eq!(manifest_key(&manifest, &second), second.id);
    }

    #[test]
    fn test_refused_manifest_key_is_logged() {
        let capture = trellis_core::logging_facility::init_test_capture();
        let mut manifest = ConfigManifest::new();
        let key = "/export-unit/dup".to_string();
        let mut config = Map::new();
        config.insert("contentType".to_string(), json!("text/plain"));

        assert!(record_config(&mut manifest, key.clone(), config.clone()));
        assert!(!record_config(&mut manifest, key.clone(), Map::new()));

        assert_eq!(manifest.get(&key), Some(&config));
        let warned = capture
            .events_for_op(OP_EXPORT)
            .into_iter()
            .filter(|e| e.field("key") == Some(key.as_str()))
            .count();
        assert_eq!(warned, 1);
    }

    #[test]
    fn test_keyed_configuration_records_real_name() {
        let page = Entity::new(EntityKind::Page).named("home");
        let config = keyed_configuration(&page, &page.id, Map::new());
        assert_eq!(config.get(NAME_KEY), Some(&json!("home")));
        assert!(keyed_configuration(&page, "home", Map::new()).is_empty());
    }

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render_deployment(&self, _entity: &Entity) -> Result<Option<String>> {
            Err(ExError::new(trellis_core::ExErrorKind::Internal).with_message("no renderer"))
        }
    }

    #[test]
    fn test_render_failure_skips_page() {
        let dir = TempDir::new().unwrap();
        let mut db = GraphDb::open_in_memory().unwrap();
        let tx = db.tx(TxOptions::default()).unwrap();
        let mut page = Entity::new(EntityKind::Page)
            .named("home")
            .with_content("<p>hi</p>");
        tx.create(&mut page).unwrap();
        tx.commit().unwrap();

        let target = dir.path().join("out");
        let report = SnapshotExporter::with_renderer(Box::new(FailingRenderer))
            .export(&mut db, &target)
            .unwrap();

        let pages = report.category(ExportCategory::Pages).unwrap();
        assert!(pages.failure.is_none());
        assert_eq!(pages.written, 0);
        assert!(!target.join(PAGES_DIR).join("home.html").exists());
    }

    #[test]
    fn test_existing_target_is_precondition() {
        let dir = TempDir::new().unwrap();
        let mut db = GraphDb::open_in_memory().unwrap();
        let err = SnapshotExporter::new().export(&mut db, dir.path()).unwrap_err();
        assert_eq!(err.code(), "ERR_PRECONDITION_FAILED");
    }

    #[test]
    fn test_schema_document_lists_present_kinds() {
        let mut db = GraphDb::open_in_memory().unwrap();
        let tx = db.tx(TxOptions::default()).unwrap();
        let mut file = Entity::new(EntityKind::File).named("a.css");
        file.properties.set("contentType", json!("text/css"));
        tx.create(&mut file).unwrap();

        let doc = schema_document(&tx).unwrap();
        assert_eq!(doc["id"], json!(SCHEMA_DOCUMENT_ID));
        assert_eq!(doc["kinds"]["File"]["count"], json!(1));
        assert_eq!(doc["kinds"]["File"]["properties"], json!(["contentType"]));
        assert!(doc["kinds"].get("Page").is_none());
    }
}
