pub struct Migration {
    pub id: &'static str,
    pub sql: &'static str,
}

const MIGRATIONS: [(&str, &str); 2] = [
    (
        "001_graph_schema",
        include_str!("../../migrations/001_graph_schema.sql"),
    ),
    (
        "002_change_log",
        include_str!("../../migrations/002_change_log.sql"),
    ),
];

/// Every migration, in the order it must be applied
pub fn get_migrations() -> impl Iterator<Item = Migration> {
    MIGRATIONS.into_iter().map(|(id, sql)| Migration { id, sql })
}
