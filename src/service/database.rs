use crate::models::config::Config;
use crate::models::error::{BackupError, Result};
use crate::service::process::ProcessRunner;
use log::info;
use std::fs::File;
use std::path::Path;

/// Streams a logical dump of the application database, taken inside the
/// database container, into `output_file`. Only a non-zero exit of the dump
/// tool counts as failure.
pub fn dump_database<R: ProcessRunner + ?Sized>(
    runner: &R,
    config: &Config,
    output_file: &Path,
) -> Result<()> {
    info!("Backing up OJS database...");

    let sink = File::create(output_file).map_err(|cause| BackupError::DatabaseDump {
        path: output_file.to_path_buf(),
        cause: Box::new(BackupError::Io(cause)),
    })?;

    let args = vec![
        "exec".to_string(),
        config.db_container.clone(),
        config.sql_dump_tool.clone(),
        format!("-u{}", config.db_user),
        format!("-p{}", config.db_pass),
        config.db_name.clone(),
    ];

    runner
        .run_streaming(&config.container_runtime, &args, sink)
        .map_err(|cause| BackupError::DatabaseDump {
            path: output_file.to_path_buf(),
            cause: Box::new(cause),
        })?;

    info!("OJS database backup completed");
    Ok(())
}
