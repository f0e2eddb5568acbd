use crate::models::backup_family::BackupFamily;
use chrono::{DateTime, TimeDelta, Utc};
use std::fmt;
use std::path::PathBuf;

/// Overall status of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every family produced an archive
    Completed,
    /// At least one family produced an archive, at least one failed
    Partial,
    /// No family produced an archive
    Failed,
}

/// The pipeline stage a family failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Prepare,
    Staging,
    ContainerCopy,
    DatabaseDump,
    Archive,
    StoreDump,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Prepare => "prepare",
            Stage::Staging => "staging",
            Stage::ContainerCopy => "container copy",
            Stage::DatabaseDump => "database dump",
            Stage::Archive => "archive",
            Stage::StoreDump => "document store dump",
        };
        f.write_str(name)
    }
}

/// What happened to one backup family during a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FamilyOutcome {
    Archived {
        path: PathBuf,
        bytes: u64,
        pruned: Vec<PathBuf>,
    },
    Failed {
        stage: Stage,
        message: String,
    },
}

impl FamilyOutcome {
    pub fn is_archived(&self) -> bool {
        matches!(self, FamilyOutcome::Archived { .. })
    }
}

/// Summary of one backup run, keyed by its run timestamp
#[derive(Debug, Clone)]
pub struct RunReport {
    pub timestamp: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<(BackupFamily, FamilyOutcome)>,
}

impl RunReport {
    pub fn status(&self) -> RunStatus {
        let archived = self.outcomes.iter().filter(|(_, o)| o.is_archived()).count();
        if archived == self.outcomes.len() {
            RunStatus::Completed
        } else if archived == 0 {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }

    /// Wall-clock time the run took
    pub fn duration(&self) -> TimeDelta {
        self.finished_at - self.started_at
    }

    pub fn outcome(&self, family: BackupFamily) -> Option<&FamilyOutcome> {
        self.outcomes
            .iter()
            .find(|(f, _)| *f == family)
            .map(|(_, outcome)| outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcomes: Vec<(BackupFamily, FamilyOutcome)>) -> RunReport {
        RunReport {
            timestamp: "2025-01-01_00-00-00".to_string(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            outcomes,
        }
    }

    fn archived() -> FamilyOutcome {
        FamilyOutcome::Archived {
            path: PathBuf::from("x.zip"),
            bytes: 1,
            pruned: vec![],
        }
    }

    fn failed(stage: Stage) -> FamilyOutcome {
        FamilyOutcome::Failed {
            stage,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_status() {
        assert_eq!(
            report(vec![
                (BackupFamily::Ojs, archived()),
                (BackupFamily::DocumentStore, archived())
            ])
            .status(),
            RunStatus::Completed
        );
        assert_eq!(
            report(vec![
                (BackupFamily::Ojs, failed(Stage::DatabaseDump)),
                (BackupFamily::DocumentStore, archived())
            ])
            .status(),
            RunStatus::Partial
        );
        assert_eq!(
            report(vec![
                (BackupFamily::Ojs, failed(Stage::ContainerCopy)),
                (BackupFamily::DocumentStore, failed(Stage::StoreDump))
            ])
            .status(),
            RunStatus::Failed
        );
    }

    #[test]
    fn test_duration_spans_start_to_finish() {
        let mut report = report(vec![]);
        report.finished_at = report.started_at + TimeDelta::seconds(95);
        assert_eq!(report.duration().num_seconds(), 95);
    }

    #[test]
    fn test_outcome_lookup() {
        let report = report(vec![(BackupFamily::Ojs, failed(Stage::Archive))]);
        assert!(report.outcome(BackupFamily::Ojs).is_some());
        assert!(report.outcome(BackupFamily::DocumentStore).is_none());
    }
}
