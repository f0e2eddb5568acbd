use crate::models::error::{BackupError, Result};
use crate::service::process::ProcessRunner;
use log::info;
use std::path::Path;

/// Copies the contents of `source_in_container` out of a running container
/// into `destination` using `<runtime> cp <container>:<src>/. <dest>`.
pub fn extract<R: ProcessRunner + ?Sized>(
    runner: &R,
    runtime: &str,
    container: &str,
    source_in_container: &str,
    destination: &Path,
) -> Result<()> {
    info!("Preparing data: {} - {}", container, source_in_container);

    let source = format!(
        "{}:{}/.",
        container,
        source_in_container.trim_end_matches('/')
    );
    let args = vec![
        "cp".to_string(),
        source,
        destination.to_string_lossy().to_string(),
    ];

    runner
        .run_checked(runtime, &args)
        .map_err(|cause| BackupError::ContainerCopy {
            container: container.to_string(),
            source_path: source_in_container.to_string(),
            cause: Box::new(cause),
        })
}
