#![allow(clippy::unwrap_used)]

mod common;

use common::{count_kind, create, default_tx, fresh_db};
use serde_json::json;
use trellis_core::errors::ExErrorKind;
use trellis_core::model::{Entity, EntityKind};
use trellis_store::graph::REL_INCLUDES;
use trellis_store::{SchemaType, TxOptions};

#[test]
fn test_callbacks_derive_nested_paths() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);

    let assets = create(&tx, EntityKind::Folder, "assets", None);
    let css = create(&tx, EntityKind::Folder, "css", Some(&assets.id));
    let file = create(&tx, EntityKind::File, "site.css", Some(&css.id));

    assert_eq!(file.path.as_deref(), Some("/assets/css/site.css"));
    tx.commit().unwrap();

    let tx = db.read_tx().unwrap();
    let found = tx
        .find_by_path(EntityKind::File, "/assets/css/site.css")
        .unwrap()
        .unwrap();
    assert_eq!(found.id, file.id);
}

#[test]
fn test_rename_refreshes_subtree_paths() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);
    let mut root = create(&tx, EntityKind::Folder, "old", None);
    let file = create(&tx, EntityKind::File, "a.txt", Some(&root.id));

    // When the folder is renamed
    root.name = Some("new".to_string());
    tx.update(&mut root).unwrap();

    // Then its descendants follow
    let stored = tx.get(&file.id).unwrap().unwrap();
    assert_eq!(stored.path.as_deref(), Some("/new/a.txt"));
}

#[test]
fn test_validation_requires_name() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);

    let mut nameless = Entity::new(EntityKind::Folder);
    let err = tx.create(&mut nameless).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);

    // Components may be anonymous
    let mut component = Entity::new(EntityKind::Component);
    tx.create(&mut component).unwrap();
}

#[test]
fn test_validation_rejects_missing_parent_and_cycles() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);

    let mut orphan = Entity::new(EntityKind::File).named("x").under("0".repeat(32));
    let err = tx.create(&mut orphan).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);

    let mut a = create(&tx, EntityKind::Folder, "a", None);
    let b = create(&tx, EntityKind::Folder, "b", Some(&a.id));
    a.parent_id = Some(b.id.clone());
    let err = tx.update(&mut a).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::CycleDetected);
}

#[test]
fn test_validation_rejects_wrong_parent_kind_and_trashed_parent() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);

    let file = create(&tx, EntityKind::File, "a.txt", None);
    let mut nested = Entity::new(EntityKind::File).named("b.txt").under(file.id.clone());
    assert_eq!(
        tx.create(&mut nested).unwrap_err().kind(),
        ExErrorKind::ValidationFailed
    );

    let folder = create(&tx, EntityKind::Folder, "gone", None);
    tx.soft_delete(&folder.id).unwrap();
    let mut child = Entity::new(EntityKind::File).named("c.txt").under(folder.id.clone());
    assert_eq!(tx.create(&mut child).unwrap_err().kind(), ExErrorKind::Deleted);
}

#[test]
fn test_unknown_schema_type_needs_registration() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);

    let mut page = Entity::new(EntityKind::Page).named("news");
    page.properties.set("type", json!("Article"));
    let err = tx.create(&mut page.clone()).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ValidationFailed);

    tx.upsert_schema_type(&SchemaType::new("Article", json!({"fields": ["title"]})))
        .unwrap();
    tx.create(&mut page).unwrap();
}

#[test]
fn test_validation_off_accepts_anything() {
    let mut db = fresh_db();
    let tx = db.tx(TxOptions::default().with_validation(false)).unwrap();
    let mut orphan = Entity::new(EntityKind::File).named("x").under("f".repeat(32));
    tx.create(&mut orphan).unwrap();
    // Missing ancestors end the path walk
    assert_eq!(orphan.path.as_deref(), Some("/x"));
}

#[test]
fn test_callbacks_off_leaves_path_underived() {
    let mut db = fresh_db();
    let tx = db.tx(TxOptions::default().with_callbacks(false)).unwrap();
    let mut folder = Entity::new(EntityKind::Folder).named("raw");
    tx.create(&mut folder).unwrap();
    assert_eq!(folder.path, None);
    assert_eq!(tx.get(&folder.id).unwrap().unwrap().path, None);
}

#[test]
fn test_notifications_toggle_controls_change_log() {
    let mut db = fresh_db();

    let tx = db.tx(TxOptions::default().with_notifications(false)).unwrap();
    create(&tx, EntityKind::Folder, "quiet", None);
    tx.commit().unwrap();
    assert!(db.read_tx().unwrap().changes_since(0).unwrap().is_empty());

    let tx = default_tx(&mut db);
    let mut loud = create(&tx, EntityKind::Folder, "loud", None);
    loud.properties.set("position", json!(2));
    tx.update(&mut loud).unwrap();
    tx.commit().unwrap();

    let changes = db.read_tx().unwrap().changes_since(0).unwrap();
    let kinds: Vec<_> = changes.iter().map(|c| c.change.as_str()).collect();
    assert_eq!(kinds, vec!["create", "update"]);
    assert!(changes.iter().all(|c| c.entity_id == loud.id));
}

#[test]
fn test_dropped_scope_rolls_back() {
    let mut db = fresh_db();
    {
        let tx = default_tx(&mut db);
        create(&tx, EntityKind::Folder, "never", None);
    }
    assert_eq!(count_kind(&mut db, EntityKind::Folder), 0);
}

#[test]
fn test_duplicate_id_is_already_exists() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);
    let first = create(&tx, EntityKind::Folder, "one", None);
    let mut again = Entity::with_id(first.id.clone(), EntityKind::Folder).named("two");
    assert_eq!(
        tx.create(&mut again).unwrap_err().kind(),
        ExErrorKind::AlreadyExists
    );
}

#[test]
fn test_children_follow_position() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);
    let page = create(&tx, EntityKind::Page, "home", None);
    for (name, pos) in [("footer", 3), ("header", 1), ("body", 2)] {
        let mut c = Entity::new(EntityKind::Component).named(name).under(page.id.clone());
        c.properties.set("position", json!(pos));
        tx.create(&mut c).unwrap();
    }
    let names: Vec<_> = tx
        .children(&page.id)
        .unwrap()
        .into_iter()
        .map(|c| c.name.unwrap())
        .collect();
    assert_eq!(names, vec!["header", "body", "footer"]);
}

#[test]
fn test_references_keep_insertion_order_and_cascade() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);
    let page = create(&tx, EntityKind::Page, "home", None);
    let nav = create(&tx, EntityKind::Component, "nav", None);
    let foot = create(&tx, EntityKind::Component, "foot", None);

    tx.set_references(&page.id, REL_INCLUDES, &[foot.id.clone(), nav.id.clone()])
        .unwrap();
    assert_eq!(
        tx.references(&page.id, REL_INCLUDES).unwrap(),
        vec![foot.id.clone(), nav.id.clone()]
    );

    assert_eq!(tx.delete(&foot.id).unwrap(), 1);
    assert_eq!(tx.references(&page.id, REL_INCLUDES).unwrap(), vec![nav.id]);
}

#[test]
fn test_delete_all_of_kind_full_replace() {
    let mut db = fresh_db();
    let tx = default_tx(&mut db);
    for sig in ["/a", "/b"] {
        let mut grant = Entity::new(EntityKind::ResourceAccess);
        grant.properties.set("signature", json!(sig));
        tx.create(&mut grant).unwrap();
    }
    create(&tx, EntityKind::Folder, "stays", None);

    assert_eq!(tx.delete_all_of_kind(EntityKind::ResourceAccess).unwrap(), 2);
    assert!(tx.all_of_kind(EntityKind::ResourceAccess).unwrap().is_empty());
    assert_eq!(tx.all_of_kind(EntityKind::Folder).unwrap().len(), 1);
}

#[test]
fn test_reopen_file_database_keeps_data() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("graph.db");
    {
        let mut db = trellis_store::GraphDb::open(&path).unwrap();
        let tx = default_tx(&mut db);
        create(&tx, EntityKind::Folder, "persisted", None);
        tx.commit().unwrap();
    }
    let mut db = trellis_store::GraphDb::open(&path).unwrap();
    let tx = db.read_tx().unwrap();
    assert!(tx
        .find_by_path(EntityKind::Folder, "/persisted")
        .unwrap()
        .is_some());
}
