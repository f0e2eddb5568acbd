use crate::models::config_validator::validate_config;
use crate::models::error::{BackupError, Result};
use chrono::FixedOffset;
use log::info;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Retention used outside production
pub const DEFAULT_BACKUP_KEEP: usize = 5;
/// Retention used in production when `BACK_UP_DATA_WITHIN` is unset
pub const DEFAULT_PRODUCTION_BACKUP_KEEP: usize = 30;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_backup_root")]
    pub backup_root: String,
    #[serde(default = "default_container_runtime")]
    pub container_runtime: String,
    #[serde(default = "default_app_container")]
    pub app_container: String,
    #[serde(default = "default_db_container")]
    pub db_container: String,
    #[serde(default = "default_db_user")]
    pub db_user: String,
    #[serde(default = "default_db_pass")]
    pub db_pass: String,
    #[serde(default = "default_db_name")]
    pub db_name: String,
    #[serde(default = "default_sql_dump_tool")]
    pub sql_dump_tool: String,
    #[serde(default = "default_files_path")]
    pub files_path: String,
    #[serde(default = "default_public_path")]
    pub public_path: String,
    #[serde(default = "default_store_uri")]
    pub store_uri: String,
    #[serde(default = "default_store_dump_tool")]
    pub store_dump_tool: String,
    #[serde(default = "default_schedule")]
    pub schedule: String,
    #[serde(default = "bool_true")]
    pub run_on_startup: bool,
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
    #[serde(default = "default_backup_keep")]
    pub max_backup_keep: usize,
    #[serde(default = "bool_true")]
    pub keep_failed_staging: bool,
}

fn default_backup_root() -> String { "public".to_string() }
fn default_container_runtime() -> String { "docker".to_string() }
fn default_app_container() -> String { "ojs_app_journal".to_string() }
fn default_db_container() -> String { "ojs_db_journal".to_string() }
fn default_db_user() -> String { "ojs".to_string() }
fn default_db_pass() -> String { "setYourPass".to_string() }
fn default_db_name() -> String { "stimi".to_string() }
fn default_sql_dump_tool() -> String { "/usr/bin/mariadb-dump".to_string() }
fn default_files_path() -> String { "/var/www/files".to_string() }
fn default_public_path() -> String { "/var/www/html/public".to_string() }
fn default_store_uri() -> String { "mongodb://localhost:27017".to_string() }
fn default_store_dump_tool() -> String { "mongodump".to_string() }
fn default_schedule() -> String { "0 */10 * * * *".to_string() }
const fn default_utc_offset_hours() -> i32 { 7 }
const fn default_backup_keep() -> usize { DEFAULT_BACKUP_KEEP }
const fn bool_true() -> bool { true }

impl Default for Config {
    fn default() -> Self {
        Self {
            backup_root: default_backup_root(),
            container_runtime: default_container_runtime(),
            app_container: default_app_container(),
            db_container: default_db_container(),
            db_user: default_db_user(),
            db_pass: default_db_pass(),
            db_name: default_db_name(),
            sql_dump_tool: default_sql_dump_tool(),
            files_path: default_files_path(),
            public_path: default_public_path(),
            store_uri: default_store_uri(),
            store_dump_tool: default_store_dump_tool(),
            schedule: default_schedule(),
            run_on_startup: true,
            utc_offset_hours: default_utc_offset_hours(),
            max_backup_keep: default_backup_keep(),
            keep_failed_staging: true,
        }
    }
}

impl Config {
    pub fn backup_root(&self) -> PathBuf {
        PathBuf::from(&self.backup_root)
    }

    /// Fixed offset every run timestamp is rendered in
    pub fn time_zone(&self) -> Result<FixedOffset> {
        self.utc_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                BackupError::ConfigInvalid(format!(
                    "utc_offset_hours must be between -23 and 23, got {}",
                    self.utc_offset_hours
                ))
            })
    }

    /// Copy safe to print, with the database password masked
    pub fn redacted(&self) -> Config {
        Config {
            db_pass: "****".to_string(),
            ..self.clone()
        }
    }

    /// Applies `DB_URI`, `PRODUCTION` and `BACK_UP_DATA_WITHIN`.
    ///
    /// `PRODUCTION` counts as set when it holds any non-empty value. In
    /// production the keep-count comes from `BACK_UP_DATA_WITHIN` (30 when
    /// absent), otherwise the configured `max_backup_keep` stands.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(uri) = lookup("DB_URI").filter(|v| !v.is_empty()) {
            self.store_uri = uri;
        }

        let production = lookup("PRODUCTION").is_some_and(|v| !v.is_empty());
        if production {
            self.max_backup_keep = match lookup("BACK_UP_DATA_WITHIN") {
                Some(raw) => raw.trim().parse::<usize>().map_err(|e| {
                    BackupError::ConfigInvalid(format!(
                        "BACK_UP_DATA_WITHIN must be a non-negative integer, got '{}': {}",
                        raw, e
                    ))
                })?,
                None => DEFAULT_PRODUCTION_BACKUP_KEEP,
            };
        }

        Ok(())
    }
}

/// Loads `KEY=value` lines from `path` into the process environment.
/// Variables that are already set win. Returns `false` when there is no file.
pub fn load_env_file(path: &Path) -> Result<bool> {
    match dotenvy::from_path(path) {
        Ok(()) => Ok(true),
        Err(e) if e.not_found() => Ok(false),
        Err(cause) => Err(BackupError::EnvFile {
            path: path.to_path_buf(),
            cause,
        }),
    }
}

/// Loads the optional JSON config file, overlays environment settings and
/// validates the result.
pub fn setup_config(config_file: Option<String>) -> Result<Config> {
    load_config(config_file, |key| std::env::var(key).ok())
}

fn load_config<F>(config_file: Option<String>, lookup: F) -> Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = match config_file {
        Some(config_file) => {
            let config_path = PathBuf::from(config_file);
            info!("Loading config from: {}", config_path.display());

            let config_str = fs::read_to_string(&config_path).map_err(|cause| {
                BackupError::ConfigRead {
                    path: config_path.clone(),
                    cause,
                }
            })?;

            serde_json::from_str::<Config>(&config_str).map_err(|cause| {
                BackupError::ConfigParse {
                    path: config_path,
                    cause,
                }
            })?
        }
        None => {
            info!("No config file given, using built-in defaults");
            Config::default()
        }
    };

    config.apply_env_overrides(lookup)?;

    validate_config(&config)?;

    Ok(config)
}
