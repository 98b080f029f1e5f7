use crate::error::MigrationExecutionError;
use crate::report::MigrationOutcome;
use crate::runner::{duration_ms, Reporter};
use crate::transaction;
use strata_db::DbConnection;
use strata_migration::Migration;

/// Runs every pending migration inside one transaction and always rolls it
/// back. Later files see the schema changes of earlier ones, so the result is
/// what an apply run would hit, minus anything committed.
pub(crate) async fn validate<C>(
    conn: &mut C,
    pending: &[&Migration],
    reporter: &dyn Reporter,
    outcomes: &mut Vec<MigrationOutcome>,
) where
    C: DbConnection,
{
    let Some(first) = pending.first() else {
        return;
    };

    let mut tx = match transaction::begin(conn, &first.filename).await {
        Ok(tx) => tx,
        Err(error) => {
            let outcome = MigrationOutcome::Failed {
                filename: first.filename.clone(),
                error,
            };
            reporter.migration_finished(&outcome);
            outcomes.push(outcome);
            return;
        }
    };

    let mut last = first.filename.as_str();
    for m in pending {
        last = m.filename.as_str();
        reporter.migration_started(m);

        let started = std::time::Instant::now();
        let outcome = match tx.execute_script(&m.sql).await {
            Ok(()) => MigrationOutcome::Validated {
                filename: m.filename.clone(),
                execution_time_ms: duration_ms(started.elapsed()),
            },
            Err(e) => MigrationOutcome::Failed {
                filename: m.filename.clone(),
                error: MigrationExecutionError::ScriptFailed {
                    filename: m.filename.clone(),
                    message: e.to_string(),
                },
            },
        };

        let halt = outcome.is_failure();
        if halt {
            tracing::error!(filename = %m.filename, "dry run failed, halting");
        }
        reporter.migration_finished(&outcome);
        outcomes.push(outcome);
        if halt {
            break;
        }
    }

    if let Err(e) = tx.rollback().await {
        tracing::warn!(filename = %last, error = %e, "dry run rollback failed");
    }
}
