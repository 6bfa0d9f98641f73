//! Directory discovery for tree-walking import phases

use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Dir,
    File,
}

/// One directory or file found under a phase root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// `/a/b/c` relative to the phase root
    pub rel_path: String,
    pub abs_path: PathBuf,
    pub kind: UnitKind,
}

impl Discovered {
    pub fn file_name(&self) -> &str {
        self.rel_path.rsplit('/').next().unwrap_or("")
    }

    /// Relative path of the containing directory; empty at the root
    pub fn parent_rel(&self) -> &str {
        match self.rel_path.rfind('/') {
            Some(i) => &self.rel_path[..i],
            None => "",
        }
    }

    /// File name without `.ext` when the extension matches
    pub fn stem_if_ext(&self, ext: &str) -> Option<&str> {
        if self.kind != UnitKind::File {
            return None;
        }
        self.file_name()
            .strip_suffix(ext)
            .and_then(|s| s.strip_suffix('.'))
            .filter(|s| !s.is_empty())
    }
}

/// List everything under `root`, sorted by name, each directory before its contents
///
/// # Errors
///
/// The first I/O error ends the walk.
pub fn discover(root: &Path) -> io::Result<Vec<Discovered>> {
    let mut units = Vec::new();
    for entry in WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
    {
        let entry = entry?;
        let kind = if entry.file_type().is_dir() {
            UnitKind::Dir
        } else if entry.file_type().is_file() {
            UnitKind::File
        } else {
            continue;
        };
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        units.push(Discovered {
            rel_path: to_rel_path(relative),
            abs_path: entry.path().to_path_buf(),
            kind,
        });
    }
    Ok(units)
}

fn to_rel_path(relative: &Path) -> String {
    let mut out = String::new();
    for part in relative.components() {
        out.push('/');
        out.push_str(&part.as_os_str().to_string_lossy());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_directories_precede_contents() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("b/inner")).unwrap();
        fs::write(dir.path().join("b/inner/z.txt"), b"z").unwrap();
        fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let units = discover(dir.path()).unwrap();
        let paths: Vec<_> = units.iter().map(|u| u.rel_path.as_str()).collect();
        assert_eq!(paths, vec!["/a.txt", "/b", "/b/inner", "/b/inner/z.txt"]);
        assert_eq!(units[1].kind, UnitKind::Dir);
        assert_eq!(units[3].parent_rel(), "/b/inner");
        assert_eq!(units[0].parent_rel(), "");
    }

    #[test]
    fn test_stem_if_ext() {
        let unit = Discovered {
            rel_path: "/header.html".into(),
            abs_path: PathBuf::from("/tmp/header.html"),
            kind: UnitKind::File,
        };
        assert_eq!(unit.stem_if_ext("html"), Some("header"));
        assert_eq!(unit.stem_if_ext("json"), None);
    }

    #[test]
    fn test_missing_root_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(discover(&dir.path().join("absent")).is_err());
    }
}
