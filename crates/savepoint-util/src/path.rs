//! Path utilities.
//!
//! This module provides utilities for working with file paths.

use std::path::{Component, Path, PathBuf};

/// Get the savepoint configuration directory.
///
/// This follows XDG conventions on Linux/macOS:
/// - `$XDG_CONFIG_HOME/savepoint` if set
/// - `~/.config/savepoint` otherwise
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("savepoint"))
}

/// Get the savepoint data directory.
///
/// This follows XDG conventions:
/// - `$XDG_DATA_HOME/savepoint` if set
/// - `~/.local/share/savepoint` otherwise
pub fn data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("savepoint"))
}

/// Get the default directory for backup artifacts.
pub fn backups_dir() -> Option<PathBuf> {
    data_dir().map(|p| p.join("backups"))
}

/// Normalize a path by removing `.` and `..` components.
///
/// Unlike `canonicalize`, this doesn't require the path to exist.
pub fn normalize(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            _ => {
                result.push(component);
            }
        }
    }

    result
}

/// Turn a path into a normalized absolute path.
///
/// Relative paths are resolved against the current directory. If the current
/// directory cannot be determined the path is only normalized.
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return normalize(path);
    }

    match std::env::current_dir() {
        Ok(cwd) => normalize(&cwd.join(path)),
        Err(_) => normalize(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir() {
        if let Some(dir) = config_dir() {
            assert!(dir.ends_with("savepoint"));
        }
    }

    #[test]
    fn test_backups_dir_is_under_data_dir() {
        if let (Some(data), Some(backups)) = (data_dir(), backups_dir()) {
            assert!(backups.starts_with(&data));
            assert!(backups.ends_with("backups"));
        }
    }

    #[test]
    fn test_normalize() {
        let path = Path::new("/home/user/./docs/../docs/report.sheet");
        assert_eq!(normalize(path), PathBuf::from("/home/user/docs/report.sheet"));
    }

    #[test]
    fn test_absolutize_keeps_absolute_paths() {
        let path = Path::new("/tmp/a/../b.txt");
        assert_eq!(absolutize(path), PathBuf::from("/tmp/b.txt"));
    }

    #[test]
    fn test_absolutize_resolves_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let resolved = absolutize(&dir.path().join("x/../doc.txt"));
        assert_eq!(resolved, dir.path().join("doc.txt"));

        let relative = absolutize(Path::new("doc.txt"));
        assert!(relative.is_absolute());
        assert!(relative.ends_with("doc.txt"));
    }
}
