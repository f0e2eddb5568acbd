use crate::models::error::{BackupError, Result};
use log::warn;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: PathBuf,
    /// Path relative to the walked directory
    pub relative: PathBuf,
    pub is_dir: bool,
}

/// Lists every directory and regular file below `dir` (not `dir` itself) in
/// a stable, name-sorted order. Symlinks are skipped.
pub fn get_tree_entries(dir: &Path) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| BackupError::DirectoryRead(e.to_string()))?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            warn!("Skipping symlink: {}", entry.path().display());
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| BackupError::DirectoryRead(e.to_string()))?
            .to_path_buf();

        entries.push(TreeEntry {
            path: entry.path().to_path_buf(),
            relative,
            is_dir: file_type.is_dir(),
        });
    }
    Ok(entries)
}
