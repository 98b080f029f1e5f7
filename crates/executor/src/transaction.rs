use crate::error::MigrationExecutionError;
use strata_db::{DbConnection, DbTransaction};

pub async fn begin<'a, C>(
    conn: &'a mut C,
    filename: &str,
) -> Result<Box<dyn DbTransaction + 'a>, MigrationExecutionError>
where
    C: DbConnection,
{
    conn.begin()
        .await
        .map_err(|e| MigrationExecutionError::TransactionBeginFailed {
            filename: filename.to_string(),
            message: e.to_string(),
        })
}

pub async fn commit(
    tx: Box<dyn DbTransaction + '_>,
    filename: &str,
) -> Result<(), MigrationExecutionError> {
    tx.commit()
        .await
        .map_err(|e| MigrationExecutionError::TransactionCommitFailed {
            filename: filename.to_string(),
            message: e.to_string(),
        })
}

/// Rolls back after `original_error`. When the rollback itself fails, both
/// messages travel together in the returned error; otherwise the original
/// error comes back unchanged.
pub async fn rollback(
    tx: Box<dyn DbTransaction + '_>,
    filename: &str,
    original_error: MigrationExecutionError,
) -> MigrationExecutionError {
    match tx.rollback().await {
        Ok(()) => original_error,
        Err(e) => MigrationExecutionError::TransactionRollbackFailed {
            filename: filename.to_string(),
            message: e.to_string(),
            original_error: original_error.to_string(),
        },
    }
}
