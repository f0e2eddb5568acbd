use std::fmt;
use std::path::{Path, PathBuf};

/// The two independent backup targets. Each family owns one directory under
/// the backup root and one archive extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupFamily {
    /// Application files, public assets and the SQL dump, zipped together
    Ojs,
    /// Gzip archive written directly by the document store dump tool
    DocumentStore,
}

impl BackupFamily {
    pub fn dir_name(&self) -> &'static str {
        match self {
            BackupFamily::Ojs => "ojs",
            BackupFamily::DocumentStore => "siakad",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            BackupFamily::Ojs => "zip",
            BackupFamily::DocumentStore => "gzip",
        }
    }

    /// Directory holding this family's archives
    pub fn family_dir(&self, backup_root: &Path) -> PathBuf {
        backup_root.join(self.dir_name())
    }

    /// `<backup_root>/<family>/<timestamp>.<ext>`
    pub fn archive_path(&self, backup_root: &Path, timestamp: &str) -> PathBuf {
        self.family_dir(backup_root)
            .join(format!("{}.{}", timestamp, self.extension()))
    }

    pub fn all() -> [BackupFamily; 2] {
        [BackupFamily::Ojs, BackupFamily::DocumentStore]
    }
}

impl fmt::Display for BackupFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupFamily::Ojs => write!(f, "OJS"),
            BackupFamily::DocumentStore => write!(f, "document store"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path_layout() {
        let root = Path::new("/srv/backups");
        assert_eq!(
            BackupFamily::Ojs.archive_path(root, "2025-01-02_03-04-05"),
            PathBuf::from("/srv/backups/ojs/2025-01-02_03-04-05.zip")
        );
        assert_eq!(
            BackupFamily::DocumentStore.archive_path(root, "2025-01-02_03-04-05"),
            PathBuf::from("/srv/backups/siakad/2025-01-02_03-04-05.gzip")
        );
    }
}
