use crate::models::backup_family::BackupFamily;
use crate::models::error::{BackupError, Result};
use crate::models::timestamp::parse_run_timestamp;
use chrono::NaiveDateTime;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

/// An archive found in a family directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub path: PathBuf,
    pub created_at: NaiveDateTime,
}

/// Lists the archives of `family` in `family_dir`, oldest first. Files whose
/// name is not `<run timestamp>.<family extension>` are ignored.
pub fn list_archives(family_dir: &Path, family: BackupFamily) -> Result<Vec<ArchiveInfo>> {
    if !family_dir.exists() {
        return Ok(Vec::new());
    }

    let mut archives = Vec::new();
    for entry in fs::read_dir(family_dir)? {
        let entry = entry.map_err(|e| BackupError::DirectoryRead(e.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        if let Some(created_at) = parse_archive_name(&path, family) {
            archives.push(ArchiveInfo { path, created_at });
        }
    }

    archives.sort_by(|a, b| a.created_at.cmp(&b.created_at));
    Ok(archives)
}

fn parse_archive_name(path: &Path, family: BackupFamily) -> Option<NaiveDateTime> {
    if path.extension()? != family.extension() {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    parse_run_timestamp(stem)
}

/// Deletes all but the `keep` most recent archives of `family` and returns
/// the deleted paths. `keep == 0` disables pruning.
pub fn prune(family_dir: &Path, family: BackupFamily, keep: usize) -> Result<Vec<PathBuf>> {
    if keep == 0 {
        debug!("Retention disabled for {} archives", family);
        return Ok(Vec::new());
    }

    let archives = list_archives(family_dir, family)?;
    if archives.len() <= keep {
        return Ok(Vec::new());
    }

    let excess = archives.len() - keep;
    let mut deleted = Vec::with_capacity(excess);
    for archive in archives.into_iter().take(excess) {
        fs::remove_file(&archive.path).map_err(|cause| BackupError::Remove {
            path: archive.path.clone(),
            cause,
        })?;
        info!("Pruned old {} archive: {}", family, archive.path.display());
        deleted.push(archive.path);
    }

    Ok(deleted)
}
