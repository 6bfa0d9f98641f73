use trellis_core::model::{Entity, EntityKind};
use trellis_store::{GraphDb, GraphTx, TxOptions};

/// Fresh migrated in-memory graph
#[allow(dead_code)]
pub fn fresh_db() -> GraphDb {
    GraphDb::open_in_memory().unwrap()
}

/// Create and return a named entity, committing nothing
#[allow(dead_code)]
pub fn create(tx: &GraphTx<'_>, kind: EntityKind, name: &str, parent: Option<&str>) -> Entity {
    let mut entity = Entity::new(kind).named(name);
    entity.parent_id = parent.map(str::to_string);
    tx.create(&mut entity).unwrap();
    entity
}

#[allow(dead_code)]
pub fn count_kind(db: &mut GraphDb, kind: EntityKind) -> usize {
    db.read_tx().unwrap().all_of_kind(kind).unwrap().len()
}

#[allow(dead_code)]
pub fn default_tx(db: &mut GraphDb) -> GraphTx<'_> {
    db.tx(TxOptions::default()).unwrap()
}
