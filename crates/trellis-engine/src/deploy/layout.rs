//! On-disk snapshot layout, relative to the snapshot root

pub const SECURITY_DIR: &str = "security";
pub const USERS_MANIFEST: &str = "security/users.json";
pub const GRANTS_MANIFEST: &str = "security/grants.json";

pub const FILES_MANIFEST: &str = "files.json";
pub const PAGES_MANIFEST: &str = "pages.json";
pub const COMPONENTS_MANIFEST: &str = "components.json";
pub const TEMPLATES_MANIFEST: &str = "templates.json";

pub const SCHEMA_DIR: &str = "schema";
pub const SCHEMA_DOCUMENT: &str = "schema/schema.json";
pub const FILES_DIR: &str = "files";
pub const TEMPLATES_DIR: &str = "templates";
pub const COMPONENTS_DIR: &str = "components";
pub const PAGES_DIR: &str = "pages";

pub const DEPLOY_SCRIPT: &str = "deploy.conf";

/// Extension of rendered companion files
pub const CONTENT_EXTENSION: &str = "html";

/// Directories created by export, in creation order
pub const EXPORT_DIRS: [&str; 6] = [
    COMPONENTS_DIR,
    FILES_DIR,
    PAGES_DIR,
    SCHEMA_DIR,
    SECURITY_DIR,
    TEMPLATES_DIR,
];

/// Companion file name for a manifest key
pub fn content_file_name(key: &str) -> String {
    format!("{}.{}", key, CONTENT_EXTENSION)
}
