use crate::models::error::{BackupError, Result};
use crate::service::archive::remove_partial_archive;
use crate::service::process::ProcessRunner;
use log::info;
use std::path::Path;

/// Runs `<dump-tool> --uri=<uri> --archive=<path> --gzip`. The tool writes the
/// compressed archive itself, no staging tree is involved. Whatever the tool
/// wrote before a failure is deleted so retention never counts it.
pub fn dump_store<R: ProcessRunner + ?Sized>(
    runner: &R,
    dump_tool: &str,
    uri: &str,
    output_file: &Path,
) -> Result<()> {
    info!("Backing up document store...");

    let args = vec![
        format!("--uri={}", uri),
        format!("--archive={}", output_file.display()),
        "--gzip".to_string(),
    ];

    if let Err(cause) = runner.run_checked(dump_tool, &args) {
        remove_partial_archive(output_file);
        return Err(BackupError::StoreDump {
            path: output_file.to_path_buf(),
            cause: Box::new(cause),
        });
    }

    info!(
        "Document store backup successful: {}",
        output_file
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    );
    Ok(())
}
