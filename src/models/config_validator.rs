use crate::models::config::Config;
use crate::models::error::{BackupError, Result};
use log::{info, warn};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Validates the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    info!("Validating configuration...");

    validate_required_values(config)?;

    validate_time_zone(config)?;

    validate_retention(config);

    validate_backup_root(&config.backup_root)?;

    validate_schedule(config)?;

    info!("Configuration validation passed");
    Ok(())
}

/// Every name and path handed to an external command must be present
fn validate_required_values(config: &Config) -> Result<()> {
    let required = [
        ("container_runtime", &config.container_runtime),
        ("app_container", &config.app_container),
        ("db_container", &config.db_container),
        ("db_user", &config.db_user),
        ("db_name", &config.db_name),
        ("sql_dump_tool", &config.sql_dump_tool),
        ("files_path", &config.files_path),
        ("public_path", &config.public_path),
        ("store_uri", &config.store_uri),
        ("store_dump_tool", &config.store_dump_tool),
        ("backup_root", &config.backup_root),
    ];

    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(BackupError::ConfigInvalid(format!(
                "{} must not be empty",
                name
            )));
        }
    }

    for (name, value) in [
        ("files_path", &config.files_path),
        ("public_path", &config.public_path),
    ] {
        if !value.starts_with('/') {
            return Err(BackupError::ConfigInvalid(format!(
                "{} must be an absolute path inside the container, got: {}",
                name, value
            )));
        }
    }

    if config.db_pass.is_empty() {
        warn!("db_pass is empty - the database dump will run without a password");
    }

    Ok(())
}

fn validate_time_zone(config: &Config) -> Result<()> {
    config.time_zone()?;
    Ok(())
}

/// A keep-count of zero disables pruning rather than deleting every archive
fn validate_retention(config: &Config) {
    if config.max_backup_keep == 0 {
        warn!("max_backup_keep is 0 - retention pruning is disabled and archives will accumulate");
    } else {
        info!(
            "Keeping the {} most recent archives per backup family",
            config.max_backup_keep
        );
    }
}

/// The backup root may not exist yet, but it must be creatable and writable
fn validate_backup_root(backup_root: &str) -> Result<()> {
    let path = Path::new(backup_root);

    if path.exists() {
        if !path.is_dir() {
            return Err(BackupError::ConfigInvalid(format!(
                "Backup root exists but is not a directory: {}",
                backup_root
            )));
        }

        if let Err(e) = check_writable(path) {
            return Err(BackupError::ConfigInvalid(format!(
                "Backup root is not writable: {}\nError: {}",
                backup_root, e
            )));
        }
        return Ok(());
    }

    // Walk up to the nearest existing ancestor, that is where the tree will be created
    let ancestor = path
        .ancestors()
        .skip(1)
        .find(|p| p.as_os_str().is_empty() || p.exists());

    match ancestor {
        Some(parent) if parent.as_os_str().is_empty() => {
            warn!("Backup root does not exist but will be created: {}", backup_root);
            Ok(())
        }
        Some(parent) => {
            if let Err(e) = check_writable(parent) {
                #[cfg(windows)]
                let suggestion = format!("mkdir \"{}\"", backup_root);
                #[cfg(not(windows))]
                let suggestion = format!("mkdir -p \"{}\"", backup_root);

                return Err(BackupError::ConfigInvalid(format!(
                    "Backup root cannot be created under {}: {}\nSuggestion: Create the directory with: {}",
                    parent.display(),
                    e,
                    suggestion
                )));
            }
            warn!("Backup root does not exist but will be created: {}", backup_root);
            Ok(())
        }
        None => Err(BackupError::ConfigInvalid(format!(
            "Backup root has no existing parent directory: {}",
            backup_root
        ))),
    }
}

/// Validate schedule configuration
fn validate_schedule(config: &Config) -> Result<()> {
    match cron::Schedule::from_str(&config.schedule) {
        Ok(_) => {
            info!("Schedule validated: {}", config.schedule);
            Ok(())
        }
        Err(e) => Err(BackupError::ConfigInvalid(format!(
            "Invalid cron expression in schedule: {}\nError: {}\nExample: '0 */10 * * * *' for every 10 minutes",
            config.schedule, e
        ))),
    }
}

/// Check if a directory is writable by attempting to create a temporary file
fn check_writable(path: &Path) -> std::io::Result<()> {
    let test_file = path.join(".rustystackbackup_write_test");

    fs::write(&test_file, b"test")?;

    fs::remove_file(&test_file)?;

    Ok(())
}
