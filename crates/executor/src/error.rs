use strata_db::DbError;
use strata_migration::MigrationDriftError;
use thiserror::Error;

/// Why a single migration file did not apply. The sequencer stores it in the
/// file's outcome and stops.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationExecutionError {
    #[error("transaction begin failed for '{filename}': {message}")]
    TransactionBeginFailed { filename: String, message: String },

    #[error("migration '{filename}' failed: {message}")]
    ScriptFailed { filename: String, message: String },

    #[error("recording '{filename}' in the ledger failed: {message}")]
    LedgerWriteFailed { filename: String, message: String },

    #[error("transaction commit failed for '{filename}': {message}")]
    TransactionCommitFailed { filename: String, message: String },

    #[error(
        "transaction rollback failed for '{filename}': {message}; original_error={original_error}"
    )]
    TransactionRollbackFailed {
        filename: String,
        message: String,
        original_error: String,
    },
}

impl MigrationExecutionError {
    pub fn filename(&self) -> &str {
        match self {
            MigrationExecutionError::TransactionBeginFailed { filename, .. }
            | MigrationExecutionError::ScriptFailed { filename, .. }
            | MigrationExecutionError::LedgerWriteFailed { filename, .. }
            | MigrationExecutionError::TransactionCommitFailed { filename, .. }
            | MigrationExecutionError::TransactionRollbackFailed { filename, .. } => filename,
        }
    }
}

/// Failures that stop a run before any migration is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SequencerError {
    #[error("ledger unavailable: {source}")]
    Ledger { source: DbError },

    #[error(transparent)]
    Drift(#[from] MigrationDriftError),
}
