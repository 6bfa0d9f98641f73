use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use trellis_core::model::{Entity, EntityKind};
use trellis_store::graph::REL_INCLUDES;
use trellis_store::{GraphDb, GraphTx, SchemaType, TxOptions};

pub const PAGE_MARKUP: &str = r#"<main><img src="/docs/logo.png"></main>"#;
pub const LOGO_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x00, 0xff];

#[allow(dead_code)]
pub fn fresh_db() -> GraphDb {
    GraphDb::open_in_memory().unwrap()
}

#[allow(dead_code)]
pub fn create(tx: &GraphTx<'_>, mut entity: Entity) -> Entity {
    tx.create(&mut entity).unwrap();
    entity
}

/// One folder with one file, a page showing that file and including a
/// shared component, a template, a grant and a schema type
#[allow(dead_code)]
pub fn seed_site(db: &mut GraphDb) {
    let tx = db.tx(TxOptions::default()).unwrap();
    tx.upsert_schema_type(&SchemaType::new("Article", json!({ "fields": ["title"] })))
        .unwrap();

    let mut docs = Entity::new(EntityKind::Folder).named("docs");
    docs.properties.set("visibleToPublicUsers", json!(true));
    let docs = create(&tx, docs);

    let mut logo = Entity::new(EntityKind::File)
        .named("logo.png")
        .under(docs.id.clone())
        .with_content(LOGO_BYTES.to_vec());
    logo.properties.set("contentType", json!("image/png"));
    logo.properties.set("cacheForSeconds", json!(600));
    create(&tx, logo);

    let mut header = Entity::new(EntityKind::Component)
        .named("header")
        .with_content("<header>Site</header>");
    header.properties.set("position", json!(1));
    let header = create(&tx, header);

    let mut home = Entity::new(EntityKind::Page)
        .named("home")
        .with_content(PAGE_MARKUP);
    home.properties.set("dontCache", json!(true));
    home.properties.set("showConditions", json!("me.isAdmin"));
    let home = create(&tx, home);
    tx.add_reference(&home.id, &header.id, REL_INCLUDES).unwrap();

    create(
        &tx,
        Entity::new(EntityKind::Template)
            .named("base")
            .with_content("<html>${render.children}</html>"),
    );

    let mut grant = Entity::new(EntityKind::ResourceAccess);
    grant.properties.set("signature", json!("/api/articles"));
    grant.properties.set("flags", json!(3));
    create(&tx, grant);

    tx.commit().unwrap();
}

#[allow(dead_code)]
pub fn count_kind(db: &mut GraphDb, kind: EntityKind) -> usize {
    db.read_tx().unwrap().all_of_kind(kind).unwrap().len()
}

#[allow(dead_code)]
pub fn by_path(db: &mut GraphDb, kind: EntityKind, path: &str) -> Entity {
    db.read_tx()
        .unwrap()
        .find_by_path(kind, path)
        .unwrap()
        .unwrap_or_else(|| panic!("no {} at {}", kind.as_str(), path))
}

#[allow(dead_code)]
pub fn by_name(db: &mut GraphDb, kind: EntityKind, name: &str) -> Entity {
    db.read_tx()
        .unwrap()
        .find_by_name(kind, name)
        .unwrap()
        .unwrap_or_else(|| panic!("no {} named {}", kind.as_str(), name))
}

/// Relative path and bytes of every file under `root`, sorted
#[allow(dead_code)]
pub fn tree_contents(root: &Path) -> Vec<(PathBuf, Vec<u8>)> {
    let mut out: Vec<_> = walkdir::WalkDir::new(root)
        .into_iter()
        .map(Result::unwrap)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e.path().strip_prefix(root).unwrap().to_path_buf();
            (rel, fs::read(e.path()).unwrap())
        })
        .collect();
    out.sort();
    out
}
