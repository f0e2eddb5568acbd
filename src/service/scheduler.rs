use crate::models::error::{BackupError, Result};
use chrono::{DateTime, Utc};
use cron::Schedule;
use log::{info, warn};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// Longest single sleep, so a shutdown request is noticed promptly
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Fires the backup trigger once at startup and then on a cron schedule.
pub struct Scheduler {
    expression: String,
    schedule: Schedule,
}

impl Scheduler {
    pub fn new(expression: &str) -> Result<Self> {
        let schedule = Schedule::from_str(expression).map_err(|cause| BackupError::Schedule {
            expression: expression.to_string(),
            cause,
        })?;
        Ok(Self {
            expression: expression.to_string(),
            schedule,
        })
    }

    /// First scheduled instant strictly after `after`
    pub fn next_fire_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.schedule.after(&after).next()
    }

    /// Calls `fire` immediately when `run_on_startup` is set, then at every
    /// scheduled instant until `running` is cleared. `fire` should hand the
    /// work off rather than block, otherwise instants that pass while it runs
    /// are missed.
    pub fn run<F: FnMut()>(&self, run_on_startup: bool, running: &AtomicBool, mut fire: F) {
        info!("Starting scheduled backup mode with schedule: {}", self.expression);

        if run_on_startup && running.load(Ordering::SeqCst) {
            info!("Running initial backup on startup...");
            fire();
        }

        while running.load(Ordering::SeqCst) {
            let Some(next) = self.next_fire_after(Utc::now()) else {
                warn!("No upcoming scheduled times found");
                break;
            };

            info!(
                "Next backup scheduled for: {}",
                next.format("%Y-%m-%d %H:%M:%S %Z")
            );

            if !sleep_until(next, running) {
                break;
            }

            info!("Running scheduled backup...");
            fire();
        }

        info!("Scheduler stopped");
    }
}

/// Sleeps until `deadline`. Returns false if `running` was cleared first.
fn sleep_until(deadline: DateTime<Utc>, running: &AtomicBool) -> bool {
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        let now = Utc::now();
        if now >= deadline {
            return true;
        }
        let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
        std::thread::sleep(remaining.min(POLL_INTERVAL));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};
    use std::time::Instant;

    const EVERY_TEN_MINUTES: &str = "0 */10 * * * *";

    #[test]
    fn test_fires_immediately_on_startup() {
        let scheduler = Scheduler::new(EVERY_TEN_MINUTES).unwrap();
        let running = AtomicBool::new(true);
        let mut fired = 0;
        let started = Instant::now();

        scheduler.run(true, &running, || {
            fired += 1;
            running.store(false, Ordering::SeqCst);
        });

        assert_eq!(fired, 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_no_startup_fire_when_disabled() {
        let scheduler = Scheduler::new(EVERY_TEN_MINUTES).unwrap();
        let running = AtomicBool::new(false);
        let mut fired = 0;

        scheduler.run(false, &running, || fired += 1);

        assert_eq!(fired, 0);
    }

    #[test]
    fn test_keeps_firing_on_schedule() {
        let scheduler = Scheduler::new("* * * * * *").unwrap();
        let running = AtomicBool::new(true);
        let mut fired = 0;

        scheduler.run(true, &running, || {
            fired += 1;
            if fired == 3 {
                running.store(false, Ordering::SeqCst);
            }
        });

        assert_eq!(fired, 3);
    }

    #[test]
    fn test_fire_times_are_ten_minutes_apart_and_minute_aligned() {
        let scheduler = Scheduler::new(EVERY_TEN_MINUTES).unwrap();
        let start = Utc.with_ymd_and_hms(2025, 4, 1, 12, 3, 27).unwrap();

        let first = scheduler.next_fire_after(start).unwrap();
        let second = scheduler.next_fire_after(first).unwrap();
        let third = scheduler.next_fire_after(second).unwrap();

        assert_eq!(first, Utc.with_ymd_and_hms(2025, 4, 1, 12, 10, 0).unwrap());
        assert_eq!(second - first, chrono::Duration::minutes(10));
        assert_eq!(third - second, chrono::Duration::minutes(10));
        for fire in [first, second, third] {
            assert_eq!(fire.second(), 0);
            assert_eq!(fire.minute() % 10, 0);
        }
    }

    #[test]
    fn test_rejects_invalid_expression() {
        assert!(matches!(
            Scheduler::new("every ten minutes"),
            Err(BackupError::Schedule { .. })
        ));
    }
}
