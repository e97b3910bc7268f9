/*!
The filesystem control plane: existence-of-file signalling used by a human
operator (or a wrapper script) to start/stop bulk capture and to request
shutdown.
*/

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub fn start_path(ramdisk_dir: &Path) -> PathBuf {
    ramdisk_dir.join("START")
}

pub fn stop_path(ramdisk_dir: &Path) -> PathBuf {
    ramdisk_dir.join("STOP")
}

pub fn quit_path(ramdisk_dir: &Path) -> PathBuf {
    ramdisk_dir.join("QUIT")
}

/// Non-destructive peek at whether shutdown has been requested. Only the
/// Recorder deletes `QUIT` (on its own exit), so every other worker just
/// observes it.
pub fn quit_requested(ramdisk_dir: &Path) -> bool {
    quit_path(ramdisk_dir).exists()
}

/// If `START` is present, read its one-line destination directory, delete
/// the file, and return the destination. Absence is benign.
pub fn take_start(ramdisk_dir: &Path) -> Result<Option<String>> {
    let path = start_path(ramdisk_dir);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    std::fs::remove_file(&path).with_context(|| format!("failed to remove {}", path.display()))?;

    Ok(Some(contents.trim().to_string()))
}

/// If `STOP` is present, delete it and return `true`. Absence is benign.
pub fn take_stop(ramdisk_dir: &Path) -> bool {
    let path = stop_path(ramdisk_dir);
    if path.exists() {
        let _ = std::fs::remove_file(&path);
        true
    } else {
        false
    }
}

/// Remove any stale `START`/`STOP`/`QUIT` files. Used at Supervisor startup
/// and by the Recorder on its own exit.
pub fn cleanup_all(ramdisk_dir: &Path) {
    for path in [start_path(ramdisk_dir), stop_path(ramdisk_dir), quit_path(ramdisk_dir)] {
        let _ = std::fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn take_start_reads_and_deletes() {
        let dir = tempdir().unwrap();
        std::fs::write(start_path(dir.path()), "/mnt/capture\n").unwrap();

        let dest = take_start(dir.path()).unwrap();
        assert_eq!(dest, Some("/mnt/capture".to_string()));
        assert!(!start_path(dir.path()).exists());
    }

    #[test]
    fn take_start_absent_is_benign() {
        let dir = tempdir().unwrap();
        assert_eq!(take_start(dir.path()).unwrap(), None);
    }

    #[test]
    fn take_stop_reports_presence_and_deletes() {
        let dir = tempdir().unwrap();
        assert!(!take_stop(dir.path()));

        std::fs::write(stop_path(dir.path()), "").unwrap();
        assert!(take_stop(dir.path()));
        assert!(!stop_path(dir.path()).exists());
    }

    #[test]
    fn quit_requested_is_non_destructive() {
        let dir = tempdir().unwrap();
        std::fs::write(quit_path(dir.path()), "").unwrap();

        assert!(quit_requested(dir.path()));
        assert!(quit_requested(dir.path()));
        assert!(quit_path(dir.path()).exists());
    }

    #[test]
    fn cleanup_all_removes_every_control_file() {
        let dir = tempdir().unwrap();
        std::fs::write(start_path(dir.path()), "x").unwrap();
        std::fs::write(stop_path(dir.path()), "").unwrap();
        std::fs::write(quit_path(dir.path()), "").unwrap();

        cleanup_all(dir.path());

        assert!(!start_path(dir.path()).exists());
        assert!(!stop_path(dir.path()).exists());
        assert!(!quit_path(dir.path()).exists());
    }

    #[test]
    fn cleanup_all_is_idempotent_on_missing_files() {
        let dir = tempdir().unwrap();
        cleanup_all(dir.path());
        cleanup_all(dir.path());
    }
}
