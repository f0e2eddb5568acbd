use crate::models::run_report::RunReport;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Maximum number of run reports to keep in memory
const MAX_HISTORY_ENTRIES: usize = 100;

/// Single-slot guard shared by the scheduler and the run workers. At most one
/// backup run holds the slot at a time.
#[derive(Clone)]
pub struct RunSlot {
    /// Set while a run is active
    busy: Arc<AtomicBool>,

    /// Timestamp of the active run
    current_run: Arc<Mutex<Option<String>>>,

    /// Recent run reports, newest first
    history: Arc<Mutex<VecDeque<RunReport>>>,

    /// Fires dropped because a run was still active
    skipped_fires: Arc<AtomicU64>,
}

/// Held by the active run. Dropping it frees the slot.
pub struct RunPermit {
    slot: RunSlot,
}

impl RunSlot {
    pub fn new() -> Self {
        Self {
            busy: Arc::new(AtomicBool::new(false)),
            current_run: Arc::new(Mutex::new(None)),
            history: Arc::new(Mutex::new(VecDeque::new())),
            skipped_fires: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Claims the slot for the run identified by `timestamp`. Returns `None`
    /// when another run is active.
    pub fn try_acquire(&self, timestamp: &str) -> Option<RunPermit> {
        self.busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        *lock(&self.current_run) = Some(timestamp.to_string());
        Some(RunPermit { slot: self.clone() })
    }

    pub fn is_running(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Timestamp of the active run
    pub fn current_run(&self) -> Option<String> {
        lock(&self.current_run).clone()
    }

    pub fn note_skipped_fire(&self) -> u64 {
        self.skipped_fires.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn skipped_fires(&self) -> u64 {
        self.skipped_fires.load(Ordering::SeqCst)
    }

    pub fn record(&self, report: RunReport) {
        let mut history = lock(&self.history);
        history.push_front(report);
        if history.len() > MAX_HISTORY_ENTRIES {
            history.pop_back();
        }
    }

    pub fn last_run(&self) -> Option<RunReport> {
        lock(&self.history).front().cloned()
    }

    pub fn history(&self) -> Vec<RunReport> {
        lock(&self.history).iter().cloned().collect()
    }
}

impl Default for RunSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RunPermit {
    fn drop(&mut self) {
        *lock(&self.slot.current_run) = None;
        self.slot.busy.store(false, Ordering::SeqCst);
    }
}

/// Recovers the guard from a poisoned lock
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn report(timestamp: &str) -> RunReport {
        RunReport {
            timestamp: timestamp.to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes: vec![],
        }
    }

    #[test]
    fn test_second_acquire_fails_while_active() {
        let slot = RunSlot::new();

        let permit = slot.try_acquire("2025-01-01_00-00-00");
        assert!(permit.is_some());
        assert!(slot.is_running());
        assert_eq!(slot.current_run().as_deref(), Some("2025-01-01_00-00-00"));
        assert!(slot.try_acquire("2025-01-01_00-10-00").is_none());

        drop(permit);
        assert!(!slot.is_running());
        assert!(slot.current_run().is_none());
        assert!(slot.try_acquire("2025-01-01_00-10-00").is_some());
    }

    #[test]
    fn test_clones_share_the_slot() {
        let slot = RunSlot::new();
        let other = slot.clone();

        let _permit = slot.try_acquire("a");
        assert!(other.try_acquire("b").is_none());
        assert_eq!(other.note_skipped_fire(), 1);
        assert_eq!(slot.skipped_fires(), 1);
    }

    #[test]
    fn test_history_is_newest_first_and_bounded() {
        let slot = RunSlot::new();
        for i in 0..(MAX_HISTORY_ENTRIES + 5) {
            slot.record(report(&format!("run-{}", i)));
        }

        let history = slot.history();
        assert_eq!(history.len(), MAX_HISTORY_ENTRIES);
        assert_eq!(history[0].timestamp, format!("run-{}", MAX_HISTORY_ENTRIES + 4));
        assert_eq!(slot.last_run().unwrap().timestamp, history[0].timestamp);
    }
}
