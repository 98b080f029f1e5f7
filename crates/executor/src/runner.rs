use crate::dry_run;
use crate::error::{MigrationExecutionError, SequencerError};
use crate::mode::{ExecutionMode, LedgerPolicy};
use crate::report::{MigrationOutcome, RunReport};
use crate::transaction;
use core::time::Duration;
use std::collections::HashSet;
use strata_db::{DbConnection, LedgerEntry};
use strata_migration::{detect_drift, LedgerRecord, Migration};
use tracing::Instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SequencerOptions {
    pub mode: ExecutionMode,
    pub ledger: LedgerPolicy,
    /// Delay between two migrations that actually run.
    pub pause: Duration,
}

/// Receives progress while a run is in flight.
pub trait Reporter: Send + Sync {
    fn migration_started(&self, _migration: &Migration) {}

    fn migration_finished(&self, _outcome: &MigrationOutcome) {}
}

pub struct NoopReporter;

impl Reporter for NoopReporter {}

pub struct Sequencer<'r> {
    options: SequencerOptions,
    reporter: &'r dyn Reporter,
}

impl Sequencer<'static> {
    pub fn new(options: SequencerOptions) -> Self {
        Self {
            options,
            reporter: &NoopReporter,
        }
    }
}

impl<'r> Sequencer<'r> {
    pub fn with_reporter<'n>(self, reporter: &'n dyn Reporter) -> Sequencer<'n> {
        Sequencer {
            options: self.options,
            reporter,
        }
    }

    pub fn options(&self) -> &SequencerOptions {
        &self.options
    }

    /// Applies `migrations` in the order given, one transaction each, and
    /// stops at the first failure.
    ///
    /// The connection is consumed and closed exactly once before returning,
    /// whatever happened. A halted run is still `Ok`; inspect
    /// [`RunReport::status`].
    pub async fn run<C>(&self, mut conn: C, migrations: &[Migration]) -> Result<RunReport, SequencerError>
    where
        C: DbConnection,
    {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "migrate",
            %run_id,
            mode = self.options.mode.as_str(),
            ledger = self.options.ledger.as_str()
        );

        let result = self
            .run_on(&mut conn, run_id, migrations)
            .instrument(span)
            .await;

        if let Err(e) = conn.close().await {
            tracing::warn!(%run_id, error = %e, "closing database connection failed");
        }

        result
    }

    async fn run_on<C>(
        &self,
        conn: &mut C,
        run_id: Uuid,
        migrations: &[Migration],
    ) -> Result<RunReport, SequencerError>
    where
        C: DbConnection,
    {
        let applied = match self.options.ledger {
            LedgerPolicy::Enabled => load_ledger(conn, migrations).await?,
            LedgerPolicy::Disabled => HashSet::new(),
        };

        // The drift gate rejects a pending file sorting before an applied one,
        // so skipped outcomes always precede the pending ones in filename order.
        let mut outcomes = Vec::with_capacity(migrations.len());
        let mut pending = Vec::with_capacity(migrations.len());
        for m in migrations {
            if applied.contains(m.filename.as_str()) {
                tracing::debug!(filename = %m.filename, "already applied, skipping");
                let outcome = MigrationOutcome::Skipped {
                    filename: m.filename.clone(),
                };
                self.reporter.migration_finished(&outcome);
                outcomes.push(outcome);
            } else {
                pending.push(m);
            }
        }

        match self.options.mode {
            ExecutionMode::Apply => self.apply_pending(conn, run_id, &pending, &mut outcomes).await,
            ExecutionMode::DryRun => {
                dry_run::validate(conn, &pending, self.reporter, &mut outcomes).await
            }
        }

        let report = RunReport {
            run_id,
            mode: self.options.mode,
            discovered: migrations.len(),
            outcomes,
        };

        tracing::info!(
            applied = report.applied(),
            skipped = report.skipped(),
            halted = !report.is_success(),
            "run finished"
        );

        Ok(report)
    }

    async fn apply_pending<C>(
        &self,
        conn: &mut C,
        run_id: Uuid,
        pending: &[&Migration],
        outcomes: &mut Vec<MigrationOutcome>,
    ) where
        C: DbConnection,
    {
        for (idx, m) in pending.iter().enumerate() {
            if idx > 0 && !self.options.pause.is_zero() {
                tokio::time::sleep(self.options.pause).await;
            }

            self.reporter.migration_started(m);
            let outcome = match apply_one(conn, run_id, m, self.options.ledger).await {
                Ok(execution_time_ms) => MigrationOutcome::Applied {
                    filename: m.filename.clone(),
                    execution_time_ms,
                },
                Err(error) => {
                    tracing::error!(filename = %m.filename, %error, "migration failed, halting");
                    MigrationOutcome::Failed {
                        filename: m.filename.clone(),
                        error,
                    }
                }
            };

            self.reporter.migration_finished(&outcome);
            let halt = outcome.is_failure();
            outcomes.push(outcome);
            if halt {
                break;
            }
        }
    }
}

async fn load_ledger<C>(conn: &mut C, migrations: &[Migration]) -> Result<HashSet<String>, SequencerError>
where
    C: DbConnection,
{
    conn.ensure_ledger()
        .await
        .map_err(|source| SequencerError::Ledger { source })?;

    let rows = conn
        .applied_migrations()
        .await
        .map_err(|source| SequencerError::Ledger { source })?;

    let records: Vec<LedgerRecord> = rows
        .iter()
        .map(|r| LedgerRecord {
            filename: r.filename.clone(),
            checksum: r.checksum.clone(),
        })
        .collect();

    let drift = detect_drift(migrations, &records);
    for filename in &drift.missing_files {
        tracing::warn!(%filename, "ledger lists a migration with no file on disk");
    }
    drift.ensure_consistent()?;

    Ok(rows.into_iter().map(|r| r.filename).collect())
}

async fn apply_one<C>(
    conn: &mut C,
    run_id: Uuid,
    migration: &Migration,
    ledger: LedgerPolicy,
) -> Result<i32, MigrationExecutionError>
where
    C: DbConnection,
{
    let filename = migration.filename.as_str();
    let mut tx = transaction::begin(conn, filename).await?;

    let started = std::time::Instant::now();
    if let Err(e) = tx.execute_script(&migration.sql).await {
        let err = MigrationExecutionError::ScriptFailed {
            filename: filename.to_string(),
            message: e.to_string(),
        };
        return Err(transaction::rollback(tx, filename, err).await);
    }
    let execution_time_ms = duration_ms(started.elapsed());

    if ledger.is_enabled() {
        let entry = LedgerEntry {
            filename: filename.to_string(),
            checksum: migration.checksum.clone(),
            execution_time_ms,
            run_id,
        };

        if let Err(e) = tx.record_migration(&entry).await {
            let err = MigrationExecutionError::LedgerWriteFailed {
                filename: filename.to_string(),
                message: e.to_string(),
            };
            return Err(transaction::rollback(tx, filename, err).await);
        }
    }

    transaction::commit(tx, filename).await?;
    tracing::info!(%filename, execution_time_ms, "migration applied");

    Ok(execution_time_ms)
}

pub(crate) fn duration_ms(d: Duration) -> i32 {
    i32::try_from(d.as_millis()).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::{Reporter, Sequencer, SequencerOptions};
    use crate::error::{MigrationExecutionError, SequencerError};
    use crate::mode::{ExecutionMode, LedgerPolicy};
    use crate::report::{MigrationOutcome, RunStatus};
    use std::sync::Mutex;
    use strata_db::memory::MemoryDatabase;
    use strata_migration::{Migration, MigrationDriftError};

    fn migrations(specs: &[(&str, &str)]) -> Vec<Migration> {
        specs
            .iter()
            .map(|(name, sql)| Migration::from_sql(*name, *sql))
            .collect()
    }

    fn legacy() -> SequencerOptions {
        SequencerOptions {
            ledger: LedgerPolicy::Disabled,
            ..SequencerOptions::default()
        }
    }

    #[tokio::test]
    async fn applies_every_file_in_order() {
        let db = MemoryDatabase::new();
        let ms = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "create b")]);

        let report = Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &ms)
            .await
            .unwrap();

        assert_eq!(report.status(), RunStatus::Completed);
        assert_eq!(report.applied(), 2);
        assert_eq!(db.committed(), vec!["create a".to_string(), "create b".to_string()]);
        assert_eq!(db.connections_closed(), 1);
    }

    #[tokio::test]
    async fn no_files_is_a_successful_empty_run() {
        let db = MemoryDatabase::new();

        let report = Sequencer::new(legacy()).run(db.connect(), &[]).await.unwrap();

        assert!(report.is_success());
        assert!(report.outcomes.is_empty());
        assert!(db.executed().is_empty());
        assert_eq!(db.connections_closed(), 1);
    }

    #[tokio::test]
    async fn failure_halts_and_keeps_earlier_commits() {
        let db = MemoryDatabase::new();
        db.fail_when_contains("broken", "syntax error at or near \"broken\"");
        let ms = migrations(&[
            ("001_a.sql", "create a"),
            ("002_b.sql", "create b"),
            ("003_c.sql", "broken"),
            ("004_d.sql", "create d"),
        ]);

        let report = Sequencer::new(legacy()).run(db.connect(), &ms).await.unwrap();

        assert_eq!(
            report.status(),
            RunStatus::Halted {
                filename: "003_c.sql".to_string()
            }
        );
        assert_eq!(report.applied(), 2);
        assert_eq!(report.not_attempted(), 1);
        assert_eq!(db.committed(), vec!["create a".to_string(), "create b".to_string()]);
        assert!(!db.executed().contains(&"create d".to_string()));
        assert!(matches!(
            report.failure(),
            Some(MigrationExecutionError::ScriptFailed { filename, .. }) if filename == "003_c.sql"
        ));
        assert_eq!(db.connections_closed(), 1);
    }

    #[tokio::test]
    async fn failed_file_leaves_no_ledger_row() {
        let db = MemoryDatabase::new();
        db.fail_when_contains("broken", "boom");
        let ms = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "broken")]);

        Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &ms)
            .await
            .unwrap();

        let ledger: Vec<String> = db.ledger().into_iter().map(|r| r.filename).collect();
        assert_eq!(ledger, vec!["001_a.sql".to_string()]);
    }

    #[tokio::test]
    async fn rollback_failure_is_reported_with_the_original_error() {
        let db = MemoryDatabase::new();
        db.fail_when_contains("broken", "boom");
        db.fail_rollback("connection reset");
        let ms = migrations(&[("001_a.sql", "broken")]);

        let report = Sequencer::new(legacy()).run(db.connect(), &ms).await.unwrap();

        match report.failure() {
            Some(MigrationExecutionError::TransactionRollbackFailed {
                message,
                original_error,
                ..
            }) => {
                assert!(message.contains("connection reset"));
                assert!(original_error.contains("boom"));
            }
            other => panic!("unexpected failure: {other:?}"),
        }
    }

    #[tokio::test]
    async fn without_ledger_every_run_reapplies_everything() {
        let db = MemoryDatabase::new();
        let ms = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "create b")]);

        let first = Sequencer::new(legacy()).run(db.connect(), &ms).await.unwrap();
        let second = Sequencer::new(legacy()).run(db.connect(), &ms).await.unwrap();

        assert_eq!(first.applied(), 2);
        assert_eq!(second.applied(), 2);
        assert_eq!(db.committed().len(), 4);
        assert!(!db.ledger_exists());
    }

    #[tokio::test]
    async fn with_ledger_second_run_skips_applied_files() {
        let db = MemoryDatabase::new();
        let ms = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "create b")]);

        Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &ms)
            .await
            .unwrap();

        let mut more = ms.clone();
        more.push(Migration::from_sql("003_c.sql", "create c"));
        let second = Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &more)
            .await
            .unwrap();

        assert_eq!(second.skipped(), 2);
        assert_eq!(second.applied(), 1);
        assert_eq!(db.committed().len(), 3);
        assert_eq!(db.ledger().len(), 3);
    }

    #[tokio::test]
    async fn edited_applied_file_aborts_before_running_anything() {
        let db = MemoryDatabase::new();
        let ms = migrations(&[("001_a.sql", "create a")]);
        Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &ms)
            .await
            .unwrap();

        let edited = migrations(&[("001_a.sql", "create a -- edited"), ("002_b.sql", "create b")]);
        let err = Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &edited)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SequencerError::Drift(MigrationDriftError::ChecksumMismatch { .. })
        ));
        assert_eq!(db.executed().len(), 1);
        assert_eq!(db.connections_closed(), 2);
    }

    #[tokio::test]
    async fn new_file_sorting_before_applied_ones_aborts() {
        let db = MemoryDatabase::new();
        let first = migrations(&[("001_a.sql", "create a"), ("003_c.sql", "create c")]);
        Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &first)
            .await
            .unwrap();

        let all = migrations(&[
            ("001_a.sql", "create a"),
            ("002_b.sql", "create b"),
            ("003_c.sql", "create c"),
        ]);
        let err = Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &all)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            SequencerError::Drift(MigrationDriftError::OutOfOrder {
                filename: "002_b.sql".to_string(),
                latest_applied: "003_c.sql".to_string(),
            })
        );
        assert_eq!(db.committed(), vec!["create a".to_string(), "create c".to_string()]);
        assert_eq!(db.connections_closed(), 2);
    }

    #[tokio::test]
    async fn outcomes_follow_filename_order() {
        let db = MemoryDatabase::new();
        let first = migrations(&[("001_a.sql", "create a")]);
        Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &first)
            .await
            .unwrap();

        let all = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "create b")]);
        let report = Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &all)
            .await
            .unwrap();

        let order: Vec<&str> = report.outcomes.iter().map(|o| o.filename()).collect();
        assert_eq!(order, vec!["001_a.sql", "002_b.sql"]);
    }

    #[tokio::test]
    async fn ledger_failure_aborts_and_still_closes() {
        let db = MemoryDatabase::new();
        db.fail_ledger("permission denied for schema public");
        let ms = migrations(&[("001_a.sql", "create a")]);

        let err = Sequencer::new(SequencerOptions::default())
            .run(db.connect(), &ms)
            .await
            .unwrap_err();

        assert!(matches!(err, SequencerError::Ledger { .. }));
        assert!(db.executed().is_empty());
        assert_eq!(db.connections_closed(), 1);
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Reporter for Recorder {
        fn migration_started(&self, migration: &Migration) {
            self.events
                .lock()
                .unwrap()
                .push(format!("start {}", migration.filename));
        }

        fn migration_finished(&self, outcome: &MigrationOutcome) {
            let tag = if outcome.is_failure() { "fail" } else { "done" };
            self.events
                .lock()
                .unwrap()
                .push(format!("{tag} {}", outcome.filename()));
        }
    }

    #[tokio::test]
    async fn reporter_sees_each_file_as_it_runs() {
        let db = MemoryDatabase::new();
        db.fail_when_contains("broken", "boom");
        let ms = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "broken")]);
        let recorder = Recorder::default();

        Sequencer::new(legacy())
            .with_reporter(&recorder)
            .run(db.connect(), &ms)
            .await
            .unwrap();

        let events = recorder.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec![
                "start 001_a.sql".to_string(),
                "done 001_a.sql".to_string(),
                "start 002_b.sql".to_string(),
                "fail 002_b.sql".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn dry_run_commits_nothing() {
        let db = MemoryDatabase::new();
        let ms = migrations(&[("001_a.sql", "create a"), ("002_b.sql", "create b")]);
        let options = SequencerOptions {
            mode: ExecutionMode::DryRun,
            ..SequencerOptions::default()
        };

        let report = Sequencer::new(options).run(db.connect(), &ms).await.unwrap();

        assert_eq!(report.validated(), 2);
        assert_eq!(report.applied(), 0);
        assert_eq!(db.executed().len(), 2);
        assert!(db.committed().is_empty());
        assert!(db.ledger().is_empty());
    }
}
