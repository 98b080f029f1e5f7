use crate::error::MigrationExecutionError;
use crate::mode::ExecutionMode;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationOutcome {
    Applied {
        filename: String,
        execution_time_ms: i32,
    },
    /// Already in the ledger with a matching checksum.
    Skipped { filename: String },
    /// Ran inside a dry-run transaction that was rolled back.
    Validated {
        filename: String,
        execution_time_ms: i32,
    },
    Failed {
        filename: String,
        error: MigrationExecutionError,
    },
}

impl MigrationOutcome {
    pub fn filename(&self) -> &str {
        match self {
            MigrationOutcome::Applied { filename, .. }
            | MigrationOutcome::Skipped { filename }
            | MigrationOutcome::Validated { filename, .. }
            | MigrationOutcome::Failed { filename, .. } => filename,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, MigrationOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Halted { filename: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: ExecutionMode,
    pub discovered: usize,
    pub outcomes: Vec<MigrationOutcome>,
}

impl RunReport {
    pub fn applied(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Applied { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Skipped { .. }))
    }

    pub fn validated(&self) -> usize {
        self.count(|o| matches!(o, MigrationOutcome::Validated { .. }))
    }

    /// Files never attempted because the run halted first.
    pub fn not_attempted(&self) -> usize {
        self.discovered.saturating_sub(self.outcomes.len())
    }

    pub fn failure(&self) -> Option<&MigrationExecutionError> {
        self.outcomes.iter().find_map(|o| match o {
            MigrationOutcome::Failed { error, .. } => Some(error),
            _ => None,
        })
    }

    pub fn status(&self) -> RunStatus {
        match self.outcomes.last() {
            Some(MigrationOutcome::Failed { filename, .. }) => RunStatus::Halted {
                filename: filename.clone(),
            },
            _ => RunStatus::Completed,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status() == RunStatus::Completed
    }

    fn count(&self, pred: impl Fn(&MigrationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}
