//! Export → import round trips against real snapshot directories

mod common;

use common::*;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fs;
use tempfile::TempDir;
use trellis_core::model::{Entity, EntityKind};
use trellis_core::ConfigManifest;
use trellis_engine::deploy::{ExportCategory, ImportPhase, PhaseStatus, SnapshotExporter, SnapshotImporter};
use trellis_store::graph::REL_INCLUDES;
use trellis_store::TxOptions;

#[test]
fn test_round_trip_reproduces_paths_config_and_content() {
    // Given a seeded graph exported to a snapshot
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut source = fresh_db();
    seed_site(&mut source);
    let export = SnapshotExporter::new().export(&mut source, &snapshot).unwrap();
    assert!(export.is_complete());

    // When it is imported into an empty store
    let mut target = fresh_db();
    let report = SnapshotImporter::default().import(&mut target, &snapshot).unwrap();

    // Then every phase completes without item failures
    for phase in &report.phases {
        assert!(matches!(phase.status, PhaseStatus::Completed), "{:?}", phase);
        assert!(phase.failures.is_empty(), "{:?}", phase.failures);
    }

    // And folders and files come back at the same paths with the same config and bytes
    let docs = by_path(&mut target, EntityKind::Folder, "/docs");
    assert_eq!(docs.properties.get_bool("visibleToPublicUsers"), Some(true));
    let logo = by_path(&mut target, EntityKind::File, "/docs/logo.png");
    assert_eq!(logo.parent_id.as_deref(), Some(docs.id.as_str()));
    assert_eq!(logo.content.as_deref(), Some(LOGO_BYTES));
    assert_eq!(logo.properties.get_str("contentType"), Some("image/png"));
    assert_eq!(logo.properties.get_i64("cacheForSeconds"), Some(600));

    // And the page keeps its markup, configuration and component reference
    let home = by_name(&mut target, EntityKind::Page, "home");
    assert_eq!(home.content_text(), Some(PAGE_MARKUP));
    assert_eq!(home.properties.get_bool("dontCache"), Some(true));
    assert_eq!(home.properties.get_str("showConditions"), Some("me.isAdmin"));
    let header = by_name(&mut target, EntityKind::Component, "header");
    assert_eq!(header.content_text(), Some("<header>Site</header>"));
    assert_eq!(header.properties.get_i64("position"), Some(1));
    let refs = target.read_tx().unwrap().references(&home.id, REL_INCLUDES).unwrap();
    assert_eq!(refs, vec![header.id.clone()]);

    // And templates, grants and schema types are restored
    let base = by_name(&mut target, EntityKind::Template, "base");
    assert_eq!(base.content_text(), Some("<html>${render.children}</html>"));
    let grants = target.read_tx().unwrap().all_of_kind(EntityKind::ResourceAccess).unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].properties.get_str("signature"), Some("/api/articles"));
    assert_eq!(grants[0].properties.get_i64("flags"), Some(3));
    let types = target.read_tx().unwrap().schema_types().unwrap();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].name, "Article");
    assert_eq!(types[0].definition, json!({ "fields": ["title"] }));
}

#[test]
fn test_export_writes_layout_and_manifests() {
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("out");
    let mut db = fresh_db();
    seed_site(&mut db);

    let report = SnapshotExporter::new().export(&mut db, &snapshot).unwrap();

    for dir in ["components", "files", "pages", "schema", "security", "templates"] {
        assert!(snapshot.join(dir).is_dir(), "missing {}", dir);
    }
    assert_eq!(report.category(ExportCategory::Grants).unwrap().written, 1);
    assert_eq!(fs::read(snapshot.join("files/docs/logo.png")).unwrap(), LOGO_BYTES);
    assert_eq!(fs::read_to_string(snapshot.join("pages/home.html")).unwrap(), PAGE_MARKUP);

    let pages = ConfigManifest::from_slice(&fs::read(snapshot.join("pages.json")).unwrap()).unwrap();
    let home = pages.get("home").unwrap();
    assert_eq!(home.get("sharedComponents"), Some(&json!(["header"])));
    assert_eq!(home.get("dontCache"), Some(&json!(true)));

    let files = ConfigManifest::from_slice(&fs::read(snapshot.join("files.json")).unwrap()).unwrap();
    assert_eq!(files.keys().collect::<Vec<_>>(), vec!["/docs", "/docs/logo.png"]);

    let grants: Value = serde_json::from_slice(&fs::read(snapshot.join("security/grants.json")).unwrap()).unwrap();
    assert_eq!(grants, json!([{ "signature": "/api/articles", "flags": 3 }]));

    let schema: Value = serde_json::from_slice(&fs::read(snapshot.join("schema/schema.json")).unwrap()).unwrap();
    assert_eq!(schema["kinds"]["Page"]["count"], json!(1));
    assert!(schema["definitions"].get("Article").is_some());
}

#[test]
fn test_name_collision_gets_numeric_suffix() {
    // Given two files with the same name in the same container
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut db = fresh_db();
    {
        let tx = db.tx(TxOptions::default()).unwrap();
        for body in ["first", "second"] {
            let mut file = Entity::new(EntityKind::File)
                .named("a.txt")
                .with_content(body);
            file.properties.set("contentType", json!("text/plain"));
            create(&tx, file);
        }
        tx.commit().unwrap();
    }

    // When exported
    SnapshotExporter::new().export(&mut db, &snapshot).unwrap();

    // Then both land on disk under distinct names differing by a counter
    let on_disk: BTreeSet<String> = fs::read_dir(snapshot.join("files"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(on_disk, BTreeSet::from(["a.txt".to_string(), "a.txt0".to_string()]));

    // And both are keyed in the manifest, the renamed one carrying its real name
    let files = ConfigManifest::from_slice(&fs::read(snapshot.join("files.json")).unwrap()).unwrap();
    assert!(files.get("/a.txt").is_some());
    let renamed = files.get("/a.txt0").unwrap();
    assert_eq!(renamed.get("name"), Some(&json!("a.txt")));
    assert_eq!(renamed.get("contentType"), Some(&json!("text/plain")));

    // And importing restores two files with the original name and both bodies
    let mut target = fresh_db();
    SnapshotImporter::default().import(&mut target, &snapshot).unwrap();
    let restored = target
        .read_tx()
        .unwrap()
        .find_all_by_path(EntityKind::File, "/a.txt")
        .unwrap();
    assert_eq!(restored.len(), 2);
    let bodies: BTreeSet<_> = restored.iter().filter_map(|f| f.content_text()).collect();
    assert_eq!(bodies, BTreeSet::from(["first", "second"]));
}

#[test]
fn test_file_named_like_a_temp_file_survives_export() {
    // Given `a.txt.tmp` ordered before `a.txt` in the same container
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut db = fresh_db();
    {
        let tx = db.tx(TxOptions::default()).unwrap();
        for (position, name, body) in [(0, "a.txt.tmp", "kept"), (1, "a.txt", "main")] {
            let mut file = Entity::new(EntityKind::File).named(name).with_content(body);
            file.properties.set("position", json!(position));
            file.properties.set("contentType", json!("text/plain"));
            create(&tx, file);
        }
        tx.commit().unwrap();
    }

    // When exported
    let report = SnapshotExporter::new().export(&mut db, &snapshot).unwrap();

    // Then both files keep their own bytes and both are in the manifest
    assert!(report.is_complete());
    assert_eq!(fs::read(snapshot.join("files/a.txt.tmp")).unwrap(), b"kept");
    assert_eq!(fs::read(snapshot.join("files/a.txt")).unwrap(), b"main");
    let files = ConfigManifest::from_slice(&fs::read(snapshot.join("files.json")).unwrap()).unwrap();
    assert!(files.get("/a.txt.tmp").is_some());
    assert!(files.get("/a.txt").is_some());
}

#[test]
fn test_folder_sharing_a_file_name_is_disambiguated() {
    // Given a file `x` ordered before a folder `x`, next to a configured file
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut db = fresh_db();
    {
        let tx = db.tx(TxOptions::default()).unwrap();
        let parent = create(&tx, Entity::new(EntityKind::Folder).named("p"));

        let mut keep = Entity::new(EntityKind::File)
            .named("keep.txt")
            .under(parent.id.clone())
            .with_content("keep");
        keep.properties.set("contentType", json!("text/plain"));
        create(&tx, keep);

        let mut file_x = Entity::new(EntityKind::File)
            .named("x")
            .under(parent.id.clone())
            .with_content("file x");
        file_x.properties.set("position", json!(0));
        create(&tx, file_x);

        let mut folder_x = Entity::new(EntityKind::Folder)
            .named("x")
            .under(parent.id.clone());
        folder_x.properties.set("position", json!(1));
        let folder_x = create(&tx, folder_x);
        create(
            &tx,
            Entity::new(EntityKind::File)
                .named("inner.txt")
                .under(folder_x.id.clone())
                .with_content("inner"),
        );
        tx.commit().unwrap();
    }

    // When exported
    let report = SnapshotExporter::new().export(&mut db, &snapshot).unwrap();

    // Then the files category completes and the folder lands under a free name
    let files_report = report.category(ExportCategory::Files).unwrap();
    assert!(files_report.failure.is_none());
    assert_eq!(fs::read(snapshot.join("files/p/x")).unwrap(), b"file x");
    assert_eq!(fs::read(snapshot.join("files/p/x0/inner.txt")).unwrap(), b"inner");

    let files = ConfigManifest::from_slice(&fs::read(snapshot.join("files.json")).unwrap()).unwrap();
    assert!(files.get("/p/keep.txt").is_some());
    assert_eq!(files.get("/p/x0").unwrap().get("name"), Some(&json!("x")));

    // And importing restores the folder under its real name
    let mut target = fresh_db();
    SnapshotImporter::default().import(&mut target, &snapshot).unwrap();
    by_path(&mut target, EntityKind::File, "/p/x");
    by_path(&mut target, EntityKind::Folder, "/p/x");
    let inner = by_path(&mut target, EntityKind::File, "/p/x/inner.txt");
    assert_eq!(inner.content_text(), Some("inner"));
}

#[test]
fn test_same_named_sibling_folders_keep_their_configuration() {
    // Given two configured sibling folders sharing a name
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut db = fresh_db();
    {
        let tx = db.tx(TxOptions::default()).unwrap();
        for (position, public) in [(0, true), (1, false)] {
            let mut folder = Entity::new(EntityKind::Folder).named("assets");
            folder.properties.set("position", json!(position));
            folder.properties.set("visibleToPublicUsers", json!(public));
            create(&tx, folder);
        }
        tx.commit().unwrap();
    }

    // When exported
    SnapshotExporter::new().export(&mut db, &snapshot).unwrap();

    // Then each folder has its own directory and manifest entry
    let files = ConfigManifest::from_slice(&fs::read(snapshot.join("files.json")).unwrap()).unwrap();
    assert_eq!(
        files.get("/assets").unwrap().get("visibleToPublicUsers"),
        Some(&json!(true))
    );
    let second = files.get("/assets0").unwrap();
    assert_eq!(second.get("visibleToPublicUsers"), Some(&json!(false)));
    assert_eq!(second.get("name"), Some(&json!("assets")));
    assert!(snapshot.join("files/assets0").is_dir());
}

#[test]
fn test_reexport_is_byte_identical() {
    let tmp = TempDir::new().unwrap();
    let mut db = fresh_db();
    seed_site(&mut db);

    let first = tmp.path().join("one");
    let second = tmp.path().join("two");
    SnapshotExporter::new().export(&mut db, &first).unwrap();
    SnapshotExporter::new().export(&mut db, &second).unwrap();

    let a = tree_contents(&first);
    let b = tree_contents(&second);
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[test]
fn test_reversed_phase_order_breaks_component_reference() {
    // Given a snapshot whose page includes a shared component
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut source = fresh_db();
    seed_site(&mut source);
    SnapshotExporter::new().export(&mut source, &snapshot).unwrap();

    // When phases run with pages before components
    let mut reversed: Vec<ImportPhase> = ImportPhase::ORDER.to_vec();
    reversed.reverse();
    let mut target = fresh_db();
    let report = SnapshotImporter::default()
        .with_phase_order(reversed)
        .import(&mut target, &snapshot)
        .unwrap();

    // Then the page fails with an unresolved reference and is not created
    let pages = report.phase(ImportPhase::Pages).unwrap();
    assert_eq!(pages.created, 0);
    assert_eq!(pages.failures.len(), 1);
    assert_eq!(pages.failures[0].code(), "ERR_UNRESOLVED_REFERENCE");
    assert_eq!(count_kind(&mut target, EntityKind::Page), 0);
    assert_eq!(count_kind(&mut target, EntityKind::Component), 1);

    // And the default order resolves it
    let mut ordered = fresh_db();
    let report = SnapshotImporter::default().import(&mut ordered, &snapshot).unwrap();
    assert_eq!(report.phase(ImportPhase::Pages).unwrap().created, 1);
}

#[test]
fn test_reimport_updates_in_place() {
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut source = fresh_db();
    seed_site(&mut source);
    SnapshotExporter::new().export(&mut source, &snapshot).unwrap();

    let mut target = fresh_db();
    SnapshotImporter::default().import(&mut target, &snapshot).unwrap();
    let report = SnapshotImporter::default().import(&mut target, &snapshot).unwrap();

    let files = report.phase(ImportPhase::Files).unwrap();
    assert_eq!(files.created, 0);
    assert_eq!(files.updated, 2);
    for kind in [EntityKind::Folder, EntityKind::File, EntityKind::Page, EntityKind::Component, EntityKind::Template] {
        assert_eq!(count_kind(&mut target, kind), 1, "{}", kind.as_str());
    }
}

#[test]
fn test_trash_is_not_exported() {
    let tmp = TempDir::new().unwrap();
    let snapshot = tmp.path().join("snapshot");
    let mut db = fresh_db();
    seed_site(&mut db);
    let docs = by_path(&mut db, EntityKind::Folder, "/docs");
    {
        let tx = db.tx(TxOptions::default()).unwrap();
        tx.soft_delete(&docs.id).unwrap();
        tx.commit().unwrap();
    }

    SnapshotExporter::new().export(&mut db, &snapshot).unwrap();

    assert!(!snapshot.join("files/docs").exists());
    let files = ConfigManifest::from_slice(&fs::read(snapshot.join("files.json")).unwrap()).unwrap();
    assert!(files.is_empty());
}
