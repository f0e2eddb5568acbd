mod models;
mod run_state;
mod service;
mod utils;

use crate::models::backup_family::BackupFamily;
use crate::models::config::{load_env_file, setup_config, Config};
use crate::models::run_report::{FamilyOutcome, RunStatus};
use crate::run_state::RunSlot;
use crate::service::pipeline::{run_backup, spawn_run};
use crate::service::process::SystemProcessRunner;
use crate::service::scheduler::Scheduler;
use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::path::Path;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "RustyStackBackUp")]
#[command(about = "Scheduled container and document store backups", long_about = None)]
struct Cli {
    #[arg(short = 'c', long = "config", env = "STACKBACKUP_CONFIG")]
    config_file: Option<String>,

    #[arg(
        short = 'l',
        long = "log-level",
        default_value = "info",
        env = "LOG_LEVEL"
    )]
    log_level: String,

    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    #[arg(short = 'v', long = "validate-only")]
    validate_only: bool,

    #[arg(short = 'o', long = "once")]
    once: bool,
}

fn main() -> Result<()> {
    // Before parsing so `.env` can also supply LOG_LEVEL and STACKBACKUP_CONFIG
    let env_file = load_env_file(Path::new(".env"));
    let args = Cli::parse();

    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        _ => log::LevelFilter::Info,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp_secs()
        .init();

    info!("RustyStackBackUp starting...");
    match env_file {
        Ok(true) => info!("Loaded environment from .env"),
        Ok(false) => debug!("No .env file in the working directory"),
        Err(e) => warn!("{}", e),
    }
    let config_file = args
        .config_file
        .as_deref()
        .map(|path| path.trim_matches(|c| c == '"' || c == '\'').to_string());
    let config: Config = setup_config(config_file).context("Failed to load configuration")?;
    debug!("Loaded config: {:?}", config.redacted());

    if args.validate_only {
        info!("Configuration is valid. Exiting (--validate-only mode).");
        return Ok(());
    }

    if args.once {
        run_once(&config, !args.quiet)
    } else {
        run_scheduled(Arc::new(config), !args.quiet)
    }
}

fn run_once(config: &Config, show_progress: bool) -> Result<()> {
    let report = run_backup(config, &SystemProcessRunner, Utc::now(), show_progress)
        .context("Backup run could not start")?;

    for family in BackupFamily::all() {
        match report.outcome(family) {
            Some(FamilyOutcome::Archived {
                path,
                bytes,
                pruned,
            }) => info!(
                "{}: {} ({} bytes, {} old archives pruned)",
                family,
                path.display(),
                bytes,
                pruned.len()
            ),
            Some(FamilyOutcome::Failed { stage, message }) => {
                warn!("{}: failed during {}: {}", family, stage, message)
            }
            None => warn!("{}: not attempted", family),
        }
    }
    info!(
        "Run {} took {}s",
        report.timestamp,
        report.duration().num_seconds()
    );

    if report.status() != RunStatus::Completed {
        bail!("Backup run {} did not complete", report.timestamp);
    }
    Ok(())
}

fn run_scheduled(config: Arc<Config>, show_progress: bool) -> Result<()> {
    let scheduler = Scheduler::new(&config.schedule).context("Invalid cron expression")?;
    let runner = Arc::new(SystemProcessRunner);
    let slot = RunSlot::new();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        info!("Received shutdown signal, stopping scheduler...");
        r.store(false, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let mut last_worker = None;
    scheduler.run(config.run_on_startup, &running, || {
        if let Some(handle) = spawn_run(config.clone(), runner.clone(), &slot, show_progress) {
            last_worker = Some(handle);
        }
    });

    if let Some(handle) = last_worker {
        if slot.is_running() {
            info!(
                "Waiting for backup run {} to finish...",
                slot.current_run().unwrap_or_default()
            );
        }
        if handle.join().is_err() {
            warn!("Backup worker panicked");
        }
    }

    let history = slot.history();
    let completed = history
        .iter()
        .filter(|r| r.status() == RunStatus::Completed)
        .count();
    info!(
        "{} of {} backup runs completed this session, {} fires skipped",
        completed,
        history.len(),
        slot.skipped_fires()
    );
    if let Some(last) = slot.last_run() {
        info!(
            "Last run: {} ({:?}, {}s)",
            last.timestamp,
            last.status(),
            last.duration().num_seconds()
        );
    }

    Ok(())
}
