//! File-system helpers shared by export and import

use serde_json::{Map, Value};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use trellis_core::manifest::grants_from_slice;
use trellis_core::ConfigManifest;
use trellis_store::errors::io_error;
use trellis_store::Result;

/// Write bytes through an anonymous temp file in the target directory, then rename
///
/// The temp name is chosen by `tempfile`, so it never collides with an
/// exported entity's file.
pub fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).map_err(|e| io_error("create_snapshot_dir", e))?;

    let shown = || target.display().to_string();
    let mut temp = NamedTempFile::new_in(parent)
        .map_err(|e| io_error("write_snapshot_temp", e).with_path(shown()))?;
    temp.write_all(content)
        .map_err(|e| io_error("write_snapshot_temp", e).with_path(shown()))?;
    temp.persist(target)
        .map_err(|e| io_error("rename_snapshot_temp", e.error).with_path(shown()))?;
    Ok(())
}

/// First free path for `name` in `dir`: `name`, then `name0`, `name1`, ...
pub fn free_path(dir: &Path, name: &str) -> (String, PathBuf) {
    let mut disk_name = name.to_string();
    let mut candidate = dir.join(&disk_name);
    let mut i = 0u64;
    while candidate.exists() {
        disk_name = format!("{}{}", name, i);
        candidate = dir.join(&disk_name);
        i += 1;
    }
    (disk_name, candidate)
}

/// Read a manifest, treating absent or unreadable files as empty
pub fn read_manifest(path: &Path) -> ConfigManifest {
    if !path.exists() {
        return ConfigManifest::new();
    }
    let parsed = fs::read(path)
        .map_err(|e| io_error("read_manifest", e))
        .and_then(|bytes| ConfigManifest::from_slice(&bytes).map_err(Into::into));
    match parsed {
        Ok(manifest) => manifest,
        Err(e) => {
            tracing::warn!(component = "deploy", path = %path.display(), error = %e, "unreadable manifest ignored");
            ConfigManifest::new()
        }
    }
}

/// Read the grants list, treating absent or unreadable files as empty
pub fn read_grants(path: &Path) -> Vec<Map<String, Value>> {
    if !path.exists() {
        return Vec::new();
    }
    let parsed = fs::read(path)
        .map_err(|e| io_error("read_grants", e))
        .and_then(|bytes| grants_from_slice(&bytes).map_err(Into::into));
    match parsed {
        Ok(grants) => grants,
        Err(e) => {
            tracing::warn!(component = "deploy", path = %path.display(), error = %e, "unreadable grants ignored");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_free_path_appends_counter() {
        let dir = TempDir::new().unwrap();
        let (name, path) = free_path(dir.path(), "a.txt");
        assert_eq!(name, "a.txt");
        fs::write(&path, b"1").unwrap();

        let (name, path) = free_path(dir.path(), "a.txt");
        assert_eq!(name, "a.txt0");
        fs::write(&path, b"2").unwrap();

        let (name, _) = free_path(dir.path(), "a.txt");
        assert_eq!(name, "a.txt1");
    }

    #[test]
    fn test_atomic_write_leaves_no_temp() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested").join("files.json");
        atomic_write(&target, b"{}").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"{}");
        let entries: Vec<_> = fs::read_dir(dir.path().join("nested")).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_atomic_write_spares_lookalike_neighbour() {
        let dir = TempDir::new().unwrap();
        atomic_write(&dir.path().join("a.txt.tmp"), b"first").unwrap();
        atomic_write(&dir.path().join("a.txt"), b"second").unwrap();
        assert_eq!(fs::read(dir.path().join("a.txt.tmp")).unwrap(), b"first");
        assert_eq!(fs::read(dir.path().join("a.txt")).unwrap(), b"second");
    }

    #[test]
    fn test_unreadable_manifest_is_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pages.json");
        fs::write(&path, b"[not an object").unwrap();
        assert!(read_manifest(&path).is_empty());
        assert!(read_manifest(&dir.path().join("missing.json")).is_empty());
    }
}
