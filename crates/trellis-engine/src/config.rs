//! Engine configuration
//!
//! Read from an optional `trellis.toml`. Every field has a default, and CLI
//! flags override whatever the file says.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use trellis_core::errors::{ExError, ExErrorKind};
use trellis_core::logging_facility::Profile;
use trellis_store::errors::io_error;
use trellis_store::Result;

pub const DEFAULT_CONFIG_FILE: &str = "trellis.toml";
pub const DEFAULT_DB_PATH: &str = ".trellis/graph.db";
pub const DEFAULT_COMMIT_COUNT: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrellisConfig {
    /// SQLite graph database
    pub db_path: PathBuf,
    /// Items per committed batch during import and maintenance
    pub commit_count: u64,
    pub log_profile: Profile,
}

impl Default for TrellisConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            commit_count: DEFAULT_COMMIT_COUNT,
            log_profile: Profile::Development,
        }
    }
}

impl TrellisConfig {
    /// Load configuration
    ///
    /// An explicit path must exist. Without one, `trellis.toml` in the
    /// working directory is used when present, defaults otherwise.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read and `InvalidInput` if it is
    /// not valid configuration TOML.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let text = std::fs::read_to_string(&path)
            .map_err(|e| io_error("load_config", e).with_path(path.display().to_string()))?;
        Self::from_toml(&text).map_err(|e| e.with_path(path.display().to_string()))
    }

    /// # Errors
    ///
    /// Returns `InvalidInput` for malformed TOML or unknown keys.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| {
            ExError::new(ExErrorKind::InvalidInput)
                .with_op("load_config")
                .with_message(e.to_string())
        })
    }

    /// Apply command-line overrides
    pub fn with_overrides(mut self, db_path: Option<PathBuf>, commit_count: Option<u64>) -> Self {
        if let Some(db) = db_path {
            self.db_path = db;
        }
        if let Some(n) = commit_count {
            self.commit_count = n;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrellisConfig::default();
        assert_eq!(config.db_path, PathBuf::from(".trellis/graph.db"));
        assert_eq!(config.commit_count, 1000);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = TrellisConfig::from_toml("commit_count = 50\nlog_profile = \"production\"\n").unwrap();
        assert_eq!(config.commit_count, 50);
        assert_eq!(config.log_profile, Profile::Production);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_malformed_is_invalid_input() {
        let err = TrellisConfig::from_toml("commit_count = \"many\"").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);

        let err = TrellisConfig::from_toml("unknown_key = 1").unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_overrides_win() {
        let config = TrellisConfig::default().with_overrides(Some(PathBuf::from("x.db")), Some(7));
        assert_eq!(config.db_path, PathBuf::from("x.db"));
        assert_eq!(config.commit_count, 7);
    }

    #[test]
    fn test_explicit_missing_file_is_io() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = TrellisConfig::load(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Io);
    }
}
