pub mod backup_family;
pub mod config;
pub mod config_validator;
pub mod error;
pub mod run_report;
pub mod timestamp;
