use crate::models::error::{BackupError, Result};
use log::{debug, info};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Root shared by every staging tree, removed as a whole on discard
pub const STAGING_ROOT: &str = "temp_ojs";
pub const FILES_DIR: &str = "files";
pub const PUBLIC_DIR: &str = "public";
pub const DATABASE_DIR: &str = "database";

/// `<backup_root>/temp_ojs`
pub fn staging_root(backup_root: &Path) -> PathBuf {
    backup_root.join(STAGING_ROOT)
}

/// `<backup_root>/temp_ojs/temp_<timestamp>`, a pure function of the run timestamp
pub fn staging_path(backup_root: &Path, timestamp: &str) -> PathBuf {
    staging_root(backup_root).join(format!("temp_{}", timestamp))
}

/// Creates the staging tree with its `files`, `public` and `database`
/// subfolders. Existing directories are left as they are.
pub fn prepare_staging(backup_root: &Path, timestamp: &str) -> Result<PathBuf> {
    let staging = staging_path(backup_root, timestamp);

    for sub in [FILES_DIR, PUBLIC_DIR, DATABASE_DIR] {
        let dir = staging.join(sub);
        fs::create_dir_all(&dir).map_err(|cause| BackupError::DirectoryCreate {
            path: dir.clone(),
            cause,
        })?;
    }

    debug!("Prepared staging tree at {}", staging.display());
    Ok(staging)
}

/// Removes the whole staging root, including trees left behind by earlier
/// failed runs. A missing root is not an error.
pub fn discard_staging(backup_root: &Path) -> Result<()> {
    let root = staging_root(backup_root);

    match fs::remove_dir_all(&root) {
        Ok(()) => {
            info!("Cleaned temporary staging files at {}", root.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(cause) => Err(BackupError::Remove { path: root, cause }),
    }
}
