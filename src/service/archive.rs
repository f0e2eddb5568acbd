use crate::models::error::{BackupError, Result};
use crate::utils::directory::get_tree_entries;
use crate::utils::progress::format_bytes;
use log::{error, info, warn};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Zips everything under `source_dir` into `output_file`, entry names relative
/// to `source_dir` with no prefix. Returns the archive size in bytes.
///
/// Any error aborts the write and the partial archive is deleted.
pub fn create_zip(source_dir: &Path, output_file: &Path) -> Result<u64> {
    info!("Creating ZIP archive for OJS...");

    match write_zip(source_dir, output_file) {
        Ok(bytes) => {
            info!("ZIP created ({} bytes, {})", bytes, format_bytes(bytes));
            Ok(bytes)
        }
        Err(e) => {
            error!("ZIP error: {}", e);
            remove_partial_archive(output_file);
            Err(e)
        }
    }
}

fn write_zip(source_dir: &Path, output_file: &Path) -> Result<u64> {
    let archive_err = |cause| BackupError::Archive {
        path: output_file.to_path_buf(),
        cause,
    };

    let entries = get_tree_entries(source_dir)?;

    let file = File::create(output_file)?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    for entry in entries {
        let name = entry_name(&entry.relative);
        if entry.is_dir {
            zip.add_directory(name, entry_options()).map_err(archive_err)?;
        } else {
            zip.start_file(name, entry_options()).map_err(archive_err)?;
            let mut input = File::open(&entry.path)?;
            io::copy(&mut input, &mut zip)?;
        }
    }

    let mut writer = zip.finish().map_err(archive_err)?;
    writer.flush()?;
    drop(writer);

    Ok(fs::metadata(output_file)?.len())
}

/// Deflate at its highest level
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9))
}

/// Zip entry names always use `/`
fn entry_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Deletes an archive left behind by a failed write. A missing file is fine.
pub fn remove_partial_archive(output_file: &Path) {
    match fs::remove_file(output_file) {
        Ok(()) => warn!("Removed partial archive {}", output_file.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(
            "Failed to remove partial archive {}: {}",
            output_file.display(),
            e
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io::Read;
    use std::path::PathBuf;
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn build_tree(root: &Path) {
        fs::create_dir_all(root.join("files").join("journals").join("1")).unwrap();
        fs::create_dir_all(root.join("public")).unwrap();
        fs::create_dir_all(root.join("database")).unwrap();
        fs::write(
            root.join("files").join("journals").join("1").join("article.pdf"),
            vec![0u8, 1, 2, 3, 255, 254],
        )
        .unwrap();
        fs::write(root.join("database").join("database.sql"), "CREATE TABLE t (id INT);\n").unwrap();
    }

    fn read_archive(path: &Path) -> (Vec<String>, BTreeMap<String, Vec<u8>>) {
        let mut archive = ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut dirs = Vec::new();
        let mut files = BTreeMap::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            if entry.is_dir() {
                dirs.push(entry.name().trim_end_matches('/').to_string());
            } else {
                let mut content = Vec::new();
                entry.read_to_end(&mut content).unwrap();
                files.insert(entry.name().to_string(), content);
            }
        }
        dirs.sort();
        (dirs, files)
    }

    #[test]
    fn test_archive_reproduces_staged_tree() {
        let staging = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        build_tree(staging.path());
        let output = out_dir.path().join("2025-01-01_00-00-00.zip");

        let bytes = create_zip(staging.path(), &output).unwrap();

        assert_eq!(bytes, fs::metadata(&output).unwrap().len());
        let (dirs, files) = read_archive(&output);
        assert_eq!(
            dirs,
            vec!["database", "files", "files/journals", "files/journals/1", "public"]
        );
        assert_eq!(files.len(), 2);
        assert_eq!(
            files["files/journals/1/article.pdf"],
            vec![0u8, 1, 2, 3, 255, 254]
        );
        assert_eq!(files["database/database.sql"], b"CREATE TABLE t (id INT);\n".to_vec());
    }

    #[test]
    fn test_missing_source_leaves_no_partial_archive() {
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("broken.zip");

        let result = create_zip(Path::new("/this/does/not/exist"), &output);

        assert!(result.is_err());
        assert!(!output.exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_removes_started_archive() {
        use std::os::unix::net::UnixListener;

        let staging = TempDir::new().unwrap();
        let out_dir = TempDir::new().unwrap();
        build_tree(staging.path());
        // Listed as a file by the walk, but opening it fails even as root
        let _listener = UnixListener::bind(staging.path().join("public").join("php.sock")).unwrap();
        let output = out_dir.path().join("2025-01-01_00-00-00.zip");

        let result = create_zip(staging.path(), &output);

        assert!(result.is_err());
        assert!(!output.exists());
        assert_eq!(fs::read_dir(out_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_remove_partial_archive_deletes_existing_file() {
        let out_dir = TempDir::new().unwrap();
        let output = out_dir.path().join("half.zip");
        fs::write(&output, b"PK\x03\x04").unwrap();

        remove_partial_archive(&output);
        assert!(!output.exists());

        // Already gone is fine
        remove_partial_archive(&output);
    }

    #[test]
    fn test_unwritable_output_is_an_error() {
        let staging = TempDir::new().unwrap();
        build_tree(staging.path());
        let output = staging.path().join("no_such_dir").join("out.zip");

        assert!(create_zip(staging.path(), &output).is_err());
    }

    #[test]
    fn test_entry_name_uses_forward_slashes() {
        let relative = PathBuf::from("files").join("a").join("b.txt");
        assert_eq!(entry_name(&relative), "files/a/b.txt");
    }
}
