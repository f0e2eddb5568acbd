use crate::models::backup_family::BackupFamily;
use crate::models::config::Config;
use crate::models::error::{BackupError, Result};
use crate::models::run_report::{FamilyOutcome, RunReport, RunStatus, Stage};
use crate::models::timestamp::format_run_timestamp;
use crate::run_state::RunSlot;
use crate::service::archive::create_zip;
use crate::service::container::extract;
use crate::service::database::dump_database;
use crate::service::document_store::dump_store;
use crate::service::process::ProcessRunner;
use crate::service::retention::prune;
use crate::service::staging::{discard_staging, prepare_staging, DATABASE_DIR, FILES_DIR, PUBLIC_DIR};
use crate::utils::progress::stage_spinner;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// One backup run over both families. Stages run strictly in order and a
/// failing stage ends its family without touching the other one.
pub struct BackupPipeline<'a, R: ProcessRunner + ?Sized> {
    config: &'a Config,
    runner: &'a R,
    quiet: bool,
}

type StageResult<T> = std::result::Result<T, (Stage, BackupError)>;

impl<'a, R: ProcessRunner + ?Sized> BackupPipeline<'a, R> {
    pub fn new(config: &'a Config, runner: &'a R) -> Self {
        Self {
            config,
            runner,
            quiet: true,
        }
    }

    /// Show a spinner for each stage
    pub fn with_progress(mut self, show: bool) -> Self {
        self.quiet = !show;
        self
    }

    pub fn run(&self, timestamp: &str) -> RunReport {
        let started_at = Utc::now();
        info!("[{}] Starting full backup...", timestamp);

        let outcomes = match self.prepare_backup_dirs() {
            Ok(()) => vec![
                (BackupFamily::Ojs, self.run_ojs(timestamp)),
                (BackupFamily::DocumentStore, self.run_document_store(timestamp)),
            ],
            Err(e) => {
                error!("Could not prepare backup directories: {}", e);
                BackupFamily::all()
                    .into_iter()
                    .map(|family| {
                        (
                            family,
                            FamilyOutcome::Failed {
                                stage: Stage::Prepare,
                                message: e.to_string(),
                            },
                        )
                    })
                    .collect()
            }
        };

        let report = RunReport {
            timestamp: timestamp.to_string(),
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        match report.status() {
            RunStatus::Completed => info!("All backup processes completed for run {}", timestamp),
            RunStatus::Partial => warn!("Backup run {} finished with failures", timestamp),
            RunStatus::Failed => error!("Backup run {} terminated without producing an archive", timestamp),
        }
        report
    }

    fn prepare_backup_dirs(&self) -> Result<()> {
        let root = self.config.backup_root();
        let dirs = std::iter::once(root.clone())
            .chain(BackupFamily::all().into_iter().map(|f| f.family_dir(&root)));
        for dir in dirs {
            fs::create_dir_all(&dir)
                .map_err(|cause| BackupError::DirectoryCreate { path: dir, cause })?;
        }
        Ok(())
    }

    fn run_ojs(&self, timestamp: &str) -> FamilyOutcome {
        let family = BackupFamily::Ojs;
        match self.backup_ojs(timestamp) {
            Ok((path, bytes)) => self.archived(family, path, bytes),
            Err((stage, e)) => self.failed(family, timestamp, stage, e),
        }
    }

    fn backup_ojs(&self, timestamp: &str) -> StageResult<(PathBuf, u64)> {
        let root = self.config.backup_root();
        let staging = prepare_staging(&root, timestamp).map_err(|e| (Stage::Staging, e))?;

        match self.fill_and_archive(&staging, timestamp) {
            Ok(done) => {
                if let Err(e) = discard_staging(&root) {
                    warn!("Archive written but staging cleanup failed: {}", e);
                }
                Ok(done)
            }
            Err(failure) => {
                if self.config.keep_failed_staging {
                    warn!("Staging tree left for inspection: {}", staging.display());
                } else if let Err(e) = discard_staging(&root) {
                    warn!("Failed to discard staging after failed run: {}", e);
                }
                Err(failure)
            }
        }
    }

    fn fill_and_archive(&self, staging: &Path, timestamp: &str) -> StageResult<(PathBuf, u64)> {
        let config = self.config;

        let spinner = stage_spinner(self.quiet, "Copying application data out of the container");
        let copied = [
            (&config.files_path, FILES_DIR),
            (&config.public_path, PUBLIC_DIR),
        ]
        .into_iter()
        .try_for_each(|(source, sub)| {
            extract(
                self.runner,
                &config.container_runtime,
                &config.app_container,
                source,
                &staging.join(sub),
            )
        });
        spinner.finish_and_clear();
        copied.map_err(|e| (Stage::ContainerCopy, e))?;

        let spinner = stage_spinner(self.quiet, "Dumping the OJS database");
        let dump_file = staging.join(DATABASE_DIR).join("database.sql");
        let dumped = dump_database(self.runner, config, &dump_file);
        spinner.finish_and_clear();
        dumped.map_err(|e| (Stage::DatabaseDump, e))?;

        let spinner = stage_spinner(self.quiet, "Compressing the OJS backup");
        let archive = BackupFamily::Ojs.archive_path(&config.backup_root(), timestamp);
        let zipped = create_zip(staging, &archive);
        spinner.finish_and_clear();
        let bytes = zipped.map_err(|e| (Stage::Archive, e))?;

        Ok((archive, bytes))
    }

    fn run_document_store(&self, timestamp: &str) -> FamilyOutcome {
        let family = BackupFamily::DocumentStore;
        let archive = family.archive_path(&self.config.backup_root(), timestamp);

        let spinner = stage_spinner(self.quiet, "Dumping the document store");
        let result = dump_store(
            self.runner,
            &self.config.store_dump_tool,
            &self.config.store_uri,
            &archive,
        );
        spinner.finish_and_clear();

        match result {
            Ok(()) => {
                let bytes = fs::metadata(&archive).map(|m| m.len()).unwrap_or(0);
                self.archived(family, archive, bytes)
            }
            Err(e) => self.failed(family, timestamp, Stage::StoreDump, e),
        }
    }

    /// Applies retention after a successful archive write
    fn archived(&self, family: BackupFamily, path: PathBuf, bytes: u64) -> FamilyOutcome {
        let family_dir = family.family_dir(&self.config.backup_root());
        let pruned = match prune(&family_dir, family, self.config.max_backup_keep) {
            Ok(pruned) => pruned,
            Err(e) => {
                warn!("Retention pruning failed for {} archives: {}", family, e);
                Vec::new()
            }
        };
        FamilyOutcome::Archived {
            path,
            bytes,
            pruned,
        }
    }

    fn failed(&self, family: BackupFamily, timestamp: &str, stage: Stage, e: BackupError) -> FamilyOutcome {
        error!(
            "{} backup for run {} terminated during {}: {}",
            family, timestamp, stage, e
        );
        FamilyOutcome::Failed {
            stage,
            message: e.to_string(),
        }
    }
}

/// Runs one backup synchronously, stamped with `now` in the configured zone
pub fn run_backup<R: ProcessRunner + ?Sized>(
    config: &Config,
    runner: &R,
    now: DateTime<Utc>,
    show_progress: bool,
) -> Result<RunReport> {
    let timestamp = format_run_timestamp(now, &config.time_zone()?);
    Ok(BackupPipeline::new(config, runner)
        .with_progress(show_progress)
        .run(&timestamp))
}

/// Starts a run on a worker thread if the slot is free. A fire that arrives
/// while another run holds the slot is skipped and logged.
pub fn spawn_run<R: ProcessRunner + 'static>(
    config: Arc<Config>,
    runner: Arc<R>,
    slot: &RunSlot,
    show_progress: bool,
) -> Option<JoinHandle<()>> {
    let timestamp = match config.time_zone() {
        Ok(zone) => format_run_timestamp(Utc::now(), &zone),
        Err(e) => {
            error!("Cannot stamp backup run: {}", e);
            return None;
        }
    };

    let Some(permit) = slot.try_acquire(&timestamp) else {
        let skipped = slot.note_skipped_fire();
        warn!(
            "Skipping backup fire at {}: run {} is still active ({} skipped so far)",
            timestamp,
            slot.current_run().unwrap_or_default(),
            skipped
        );
        return None;
    };

    let worker_slot = slot.clone();
    let spawned = thread::Builder::new()
        .name(format!("backup-{}", timestamp))
        .spawn(move || {
            let _permit = permit;
            let report = BackupPipeline::new(&config, &*runner)
                .with_progress(show_progress)
                .run(&timestamp);
            worker_slot.record(report);
        });

    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            error!("Failed to start backup worker: {}", e);
            None
        }
    }
}
