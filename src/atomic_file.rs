//! Crash-safe file replacement shared by the config file and the queue store
//!
//! Writers hold an exclusive lock on a sibling `<name>.lock` file, write a
//! `<name>.tmp` file, sync it and rename it over the target.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or(OsStr::new("")).to_os_string();
    name.push(suffix);
    path.with_file_name(name)
}

/// Create the parent directory and take the exclusive lock for `path`.
/// The lock is released when the returned handle drops.
pub(crate) fn lock(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let lock_path = sibling(path, ".lock");
    let lock_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&lock_path)
        .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

    lock_file
        .lock_exclusive()
        .with_context(|| format!("Failed to acquire lock: {}", lock_path.display()))?;
    Ok(lock_file)
}

/// Replace the contents of `path` via temp file and rename. Caller holds the lock.
pub(crate) fn replace(path: &Path, content: &[u8]) -> Result<()> {
    let temp_path = sibling(path, ".tmp");
    let mut temp_file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&temp_path)
        .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

    temp_file
        .write_all(content)
        .with_context(|| format!("Failed to write {}", temp_path.display()))?;

    temp_file
        .sync_all()
        .with_context(|| format!("Failed to sync {}", temp_path.display()))?;

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename into {}", path.display()))
}

/// Lock, then replace
pub(crate) fn write(path: &Path, content: &[u8]) -> Result<()> {
    let _lock = lock(path)?;
    replace(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_write_creates_parent_and_replaces() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/state.json");

        write(&path, b"[1]").unwrap();
        write(&path, b"[]").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(!dir.path().join("nested/state.json.tmp").exists());
        assert!(dir.path().join("nested/state.json.lock").exists());
    }

    #[test]
    fn test_lock_is_exclusive_until_dropped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let held = lock(&path).unwrap();
        let other = File::open(dir.path().join("config.toml.lock")).unwrap();
        assert!(other.try_lock_exclusive().is_err());

        drop(held);
        assert!(other.try_lock_exclusive().is_ok());
    }
}
