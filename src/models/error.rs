use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackupError {
    #[error("Failed to read config file '{path}': {cause}")]
    ConfigRead { path: PathBuf, cause: io::Error },

    #[error("Failed to parse config file '{path}': {cause}")]
    ConfigParse {
        path: PathBuf,
        cause: serde_json::Error,
    },

    #[error("Failed to load environment file '{path}': {cause}")]
    EnvFile {
        path: PathBuf,
        cause: dotenvy::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    #[error("Failed to start '{command}': {cause}")]
    CommandSpawn { command: String, cause: io::Error },

    #[error("Command '{command}' exited with {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: String,
        stderr: String,
    },

    #[error("Failed to copy {source_path} out of container '{container}': {cause}")]
    ContainerCopy {
        container: String,
        source_path: String,
        cause: Box<BackupError>,
    },

    #[error("Database dump to '{path}' failed: {cause}")]
    DatabaseDump {
        path: PathBuf,
        cause: Box<BackupError>,
    },

    #[error("Document store dump to '{path}' failed: {cause}")]
    StoreDump {
        path: PathBuf,
        cause: Box<BackupError>,
    },

    #[error("Failed to prepare directory '{path}': {cause}")]
    DirectoryCreate { path: PathBuf, cause: io::Error },

    #[error("Failed to remove '{path}': {cause}")]
    Remove { path: PathBuf, cause: io::Error },

    #[error("Failed to read directory entry: {0}")]
    DirectoryRead(String),

    #[error("Failed to write archive '{path}': {cause}")]
    Archive {
        path: PathBuf,
        cause: zip::result::ZipError,
    },

    #[error("Invalid schedule expression '{expression}': {cause}")]
    Schedule {
        expression: String,
        cause: cron::error::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, BackupError>;
