use crate::args::MigrateArgs;
use crate::config::{self, ConfigError, MigrateConfig};
use crate::error::CliError;
use crate::output;
use crate::style::Style;
use crate::ui::Ui;
use strata_db::{DbConnection, DbError, PgDatabase};
use strata_executor::{
    ExecutionMode, MigrationOutcome, Reporter, RunReport, RunStatus, Sequencer, SequencerError, SequencerOptions,
};
use strata_migration::{discover_migrations, Migration, MigrationDiscoveryError, MigrationDriftError};

pub async fn run(args: &MigrateArgs, database_url: Option<&str>) -> Result<(), CliError> {
    run_with_env(args, database_url, config::process_env).await
}

/// `run` with an explicit environment lookup for the legacy URL fallback.
pub(crate) async fn run_with_env(
    args: &MigrateArgs,
    database_url: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), CliError> {
    let config = MigrateConfig::resolve(database_url, args, lookup).map_err(map_config_error)?;

    let ui = Ui::new(Style::detect());
    for line in ui.header("strata migrate") {
        output::line(line);
    }

    let migrations = discover_migrations(&config.migrations_dir).map_err(map_discovery_error)?;
    output::line(ui.info_line(&format!(
        "Found {} migration file(s) in {}",
        migrations.len(),
        config.migrations_dir.display()
    )));
    if migrations.is_empty() {
        output::line(ui.info_line("No migration files to run"));
    }

    let conn = PgDatabase::connect(&config.database_url)
        .await
        .map_err(map_connection_error)?;
    output::line(ui.ok_line("Connected to database"));

    let report = execute(&config.options, conn, &migrations, &ui).await?;
    finish(&ui, &config.options, &report)
}

/// Runs the sequencer on an open connection, printing each file as it goes.
pub async fn execute<C>(
    options: &SequencerOptions,
    conn: C,
    migrations: &[Migration],
    ui: &Ui,
) -> Result<RunReport, CliError>
where
    C: DbConnection,
{
    let reporter = ConsoleReporter { ui };
    Sequencer::new(*options)
        .with_reporter(&reporter)
        .run(conn, migrations)
        .await
        .map_err(map_sequencer_error)
}

/// Prints the summary and turns a halted run into an error.
pub fn finish(ui: &Ui, options: &SequencerOptions, report: &RunReport) -> Result<(), CliError> {
    output::blank();
    for line in summary_lines(ui, options, report) {
        output::line(line);
    }

    match report.status() {
        RunStatus::Completed => Ok(()),
        RunStatus::Halted { filename } => {
            let reason = report
                .failure()
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string());
            let meaning = match options.mode {
                ExecutionMode::Apply => format!(
                    "Migrations before {filename} were committed. {filename} was rolled back and {} later file(s) were not attempted.",
                    report.not_attempted()
                ),
                ExecutionMode::DryRun => format!(
                    "Dry run: nothing was committed. {filename} would fail and {} later file(s) were not checked.",
                    report.not_attempted()
                ),
            };
            Err(CliError::migration_failed(format!("Migration halted at {filename}"))
                .with_reason(reason)
                .with_meaning(meaning)
                .with_action(format!("Fix {filename} and run `strata migrate` again.")))
        }
    }
}

pub fn summary_lines(ui: &Ui, options: &SequencerOptions, report: &RunReport) -> Vec<String> {
    let status = match report.status() {
        RunStatus::Completed => "completed".to_string(),
        RunStatus::Halted { filename } => format!("halted at {filename}"),
    };

    let mut lines = vec![
        ui.kv("run_id", &report.run_id.to_string()),
        ui.kv("mode", options.mode.as_str()),
        ui.kv("ledger", options.ledger.as_str()),
        ui.kv("discovered", &report.discovered.to_string()),
    ];
    match options.mode {
        ExecutionMode::Apply => {
            lines.push(ui.kv("applied", &report.applied().to_string()));
        }
        ExecutionMode::DryRun => {
            lines.push(ui.kv("validated", &report.validated().to_string()));
        }
    }
    lines.push(ui.kv("skipped", &report.skipped().to_string()));
    lines.push(ui.kv("not attempted", &report.not_attempted().to_string()));
    lines.push(ui.kv("status", &status));
    lines
}

struct ConsoleReporter<'a> {
    ui: &'a Ui,
}

impl Reporter for ConsoleReporter<'_> {
    fn migration_started(&self, migration: &Migration) {
        output::line(self.ui.info_line(&format!("Running migration: {}", migration.filename)));
    }

    fn migration_finished(&self, outcome: &MigrationOutcome) {
        output::line(outcome_line(self.ui, outcome));
    }
}

pub fn outcome_line(ui: &Ui, outcome: &MigrationOutcome) -> String {
    let style = ui.style();
    match outcome {
        MigrationOutcome::Applied {
            filename,
            execution_time_ms,
        } => ui.item(&style.ok(), filename, &format!("applied ({execution_time_ms} ms)")),
        MigrationOutcome::Validated {
            filename,
            execution_time_ms,
        } => ui.item(&style.ok(), filename, &format!("ok, rolled back ({execution_time_ms} ms)")),
        MigrationOutcome::Skipped { filename } => ui.item(&style.skip(), filename, "already applied"),
        MigrationOutcome::Failed { filename, error } => {
            ui.item(&style.fail(), filename, &format!("failed: {error}"))
        }
    }
}

pub(crate) fn map_config_error(err: ConfigError) -> CliError {
    let action = match &err {
        ConfigError::MissingDatabaseUrl => format!(
            "Set {} (or {}) in the environment or a .env file, or pass --database-url.",
            config::DATABASE_URL_ENV,
            config::LEGACY_DATABASE_URL_ENV
        ),
        ConfigError::MissingSetting { name } => {
            format!("Set {name} in the environment or a .env file.")
        }
    };
    CliError::configuration(err.to_string()).with_action(action)
}

pub(crate) fn map_discovery_error(err: MigrationDiscoveryError) -> CliError {
    let error = CliError::discovery_failed("Migration discovery failed").with_reason(err.to_string());
    match err {
        MigrationDiscoveryError::DirectoryNotFound { .. } | MigrationDiscoveryError::NotADirectory { .. } => {
            error.with_action("Run from the project root or pass --migrations-dir.")
        }
        _ => error,
    }
}

pub(crate) fn map_connection_error(err: DbError) -> CliError {
    if let DbError::InvalidConnectionString { message } = &err {
        return CliError::configuration("Invalid database connection string")
            .with_reason(message.clone())
            .with_meaning("No migration was applied.")
            .with_action(format!(
                "Set {} to a postgres:// URL, or pass --database-url.",
                config::DATABASE_URL_ENV
            ));
    }

    CliError::connection_failed("Database connection failed")
        .with_reason(err.to_string())
        .with_meaning("No migration was applied.")
        .with_action("Check that the database is reachable and the connection string is correct.")
}

fn map_sequencer_error(err: SequencerError) -> CliError {
    match err {
        SequencerError::Ledger { source } => CliError::ledger_failed("Migration ledger unavailable")
            .with_reason(source.to_string())
            .with_meaning("No migration was applied.")
            .with_action(
                "Check that the database user may create and read the strata_migrations table, or pass --no-ledger.",
            ),
        SequencerError::Drift(MigrationDriftError::ChecksumMismatch { filename, .. }) => {
            let reason = format!("{filename} changed after it was applied");
            CliError::ledger_failed(format!("Migration drift detected for {filename}"))
                .with_reason(reason)
                .with_meaning("The file on disk no longer matches what the database ran. No migration was applied.")
                .with_action("Restore the original file and put the change in a new migration.")
        }
        SequencerError::Drift(MigrationDriftError::OutOfOrder {
            filename,
            latest_applied,
        }) => CliError::ledger_failed(format!("{filename} is out of order"))
            .with_reason(format!(
                "{filename} is pending, but {latest_applied} is already applied and sorts after it"
            ))
            .with_meaning("Applying it now would break filename order. No migration was applied.")
            .with_action(format!("Rename {filename} so it sorts after {latest_applied}.")),
    }
}

#[cfg(test)]
mod tests {
    use super::{execute, finish, outcome_line, run_with_env, summary_lines};
    use crate::args::MigrateArgs;
    use crate::error::ExitCode;
    use crate::style::Style;
    use crate::ui::Ui;
    use strata_db::memory::MemoryDatabase;
    use strata_executor::{ExecutionMode, LedgerPolicy, MigrationOutcome, SequencerOptions};
    use strata_migration::Migration;

    fn ui() -> Ui {
        Ui::new(Style::plain())
    }

    fn args(dir: impl Into<std::path::PathBuf>) -> MigrateArgs {
        MigrateArgs {
            migrations_dir: dir.into(),
            dry_run: false,
            no_ledger: false,
            pause_ms: 0,
        }
    }

    #[tokio::test]
    async fn missing_url_is_reported_before_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        let missing_dir = tmp.path().join("no-such-dir");

        let err = run_with_env(&args(missing_dir), None, |_| None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ExitCode::Configuration);
    }

    #[tokio::test]
    async fn malformed_url_is_a_configuration_error() {
        let tmp = tempfile::tempdir().unwrap();

        let err = run_with_env(&args(tmp.path()), Some("not a url at all"), |_| None)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ExitCode::Configuration);
        assert!(err.title().contains("connection string"));
    }

    #[tokio::test]
    async fn dry_run_halt_does_not_claim_commits() {
        let db = MemoryDatabase::new();
        db.fail_when_contains("oops", "syntax error at or near \"oops\"");
        let ms = vec![
            Migration::from_sql("001_a.sql", "create a"),
            Migration::from_sql("002_b.sql", "oops"),
        ];
        let options = SequencerOptions {
            mode: ExecutionMode::DryRun,
            ..SequencerOptions::default()
        };

        let report = execute(&options, db.connect(), &ms, &ui()).await.unwrap();
        let err = finish(&ui(), &options, &report).unwrap_err();

        let meaning = err.meaning().unwrap();
        assert!(meaning.contains("nothing was committed"), "{meaning}");
        assert!(!meaning.contains("were committed"));
        assert!(db.committed().is_empty());
    }

    #[tokio::test]
    async fn out_of_order_file_maps_to_ledger_failed() {
        let db = MemoryDatabase::new();
        let options = SequencerOptions::default();
        let first = vec![Migration::from_sql("003_c.sql", "create c")];
        execute(&options, db.connect(), &first, &ui()).await.unwrap();

        let all = vec![
            Migration::from_sql("002_b.sql", "create b"),
            Migration::from_sql("003_c.sql", "create c"),
        ];
        let err = execute(&options, db.connect(), &all, &ui()).await.unwrap_err();

        assert_eq!(err.code(), ExitCode::LedgerFailed);
        assert!(err.title().contains("002_b.sql"));
    }

    #[tokio::test]
    async fn halted_run_maps_to_migration_failed() {
        let db = MemoryDatabase::new();
        db.fail_when_contains("dup", "duplicate key value violates unique constraint");
        let ms = vec![
            Migration::from_sql("001_init.sql", "create table"),
            Migration::from_sql("002_seed.sql", "insert dup"),
        ];
        let options = SequencerOptions {
            ledger: LedgerPolicy::Disabled,
            ..SequencerOptions::default()
        };

        let report = execute(&options, db.connect(), &ms, &ui()).await.unwrap();
        let err = finish(&ui(), &options, &report).unwrap_err();

        assert_eq!(err.code(), ExitCode::MigrationFailed);
        assert!(err.title().contains("002_seed.sql"));
        assert!(err.reason().unwrap().contains("duplicate key"));
    }

    #[tokio::test]
    async fn drift_maps_to_ledger_failed() {
        let db = MemoryDatabase::new();
        let options = SequencerOptions::default();
        let original = vec![Migration::from_sql("001_init.sql", "create table")];
        execute(&options, db.connect(), &original, &ui()).await.unwrap();

        let edited = vec![Migration::from_sql("001_init.sql", "create table if not exists")];
        let err = execute(&options, db.connect(), &edited, &ui()).await.unwrap_err();

        assert_eq!(err.code(), ExitCode::LedgerFailed);
        assert!(err.title().contains("001_init.sql"));
    }

    #[tokio::test]
    async fn completed_run_summary() {
        let db = MemoryDatabase::new();
        let options = SequencerOptions::default();
        let ms = vec![Migration::from_sql("001_init.sql", "create table")];

        let report = execute(&options, db.connect(), &ms, &ui()).await.unwrap();
        assert!(finish(&ui(), &options, &report).is_ok());

        let lines = summary_lines(&ui(), &options, &report);
        assert!(lines.iter().any(|l| l.starts_with("applied") && l.ends_with(": 1")));
        assert!(lines.iter().any(|l| l.ends_with(": completed")));
    }

    #[test]
    fn outcome_lines_name_the_file() {
        let line = outcome_line(
            &ui(),
            &MigrationOutcome::Skipped {
                filename: "001_init.sql".to_string(),
            },
        );
        assert!(line.contains("001_init.sql"));
        assert!(line.ends_with("already applied"));
    }
}
