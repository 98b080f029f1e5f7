use crate::args::StatusArgs;
use crate::config;
use crate::error::CliError;
use crate::migrate::{map_config_error, map_connection_error, map_discovery_error};
use crate::output;
use crate::style::Style;
use crate::ui::Ui;
use std::collections::HashSet;
use strata_db::{AppliedMigration, DbConnection, DbError, PgDatabase};
use strata_migration::{
    checksum, detect_drift, discover_migrations, Drift, LedgerRecord, Migration, MigrationDriftError,
};

/// What the ledger says about the local migration files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStatus {
    pub initialized: bool,
    pub applied: Vec<AppliedMigration>,
    pub pending: Vec<String>,
    pub drift: Drift,
}

impl LedgerStatus {
    pub fn last_applied(&self) -> Option<&AppliedMigration> {
        self.applied
            .iter()
            .max_by(|a, b| a.applied_at.cmp(&b.applied_at).then_with(|| a.filename.cmp(&b.filename)))
    }
}

pub async fn run(args: &StatusArgs, database_url: Option<&str>) -> Result<(), CliError> {
    let database_url =
        config::resolve_database_url(database_url, config::process_env).map_err(map_config_error)?;

    let ui = Ui::new(Style::detect());
    for line in ui.header("strata status") {
        output::line(line);
    }

    let migrations = discover_migrations(&args.migrations_dir).map_err(map_discovery_error)?;

    let conn = PgDatabase::connect(&database_url)
        .await
        .map_err(map_connection_error)?;

    let status = inspect(conn, &migrations).await.map_err(|e| {
        CliError::ledger_failed("Migration ledger unreadable").with_reason(e.to_string())
    })?;

    for line in status_lines(&ui, &migrations, &status) {
        output::line(line);
    }

    status.drift.ensure_consistent().map_err(|e| {
        CliError::ledger_failed("Migration drift detected")
            .with_reason(e.to_string())
            .with_action("Restore edited files, rename out-of-order files, and put changes in new migrations.")
    })
}

/// Reads the ledger without creating it and compares it with `migrations`.
/// The connection is closed on every path.
pub async fn inspect<C>(mut conn: C, migrations: &[Migration]) -> Result<LedgerStatus, DbError>
where
    C: DbConnection,
{
    let result = read_ledger(&mut conn).await;
    if let Err(e) = conn.close().await {
        tracing::warn!(error = %e, "failed to close database connection");
    }
    let (initialized, applied) = result?;

    let records: Vec<LedgerRecord> = applied
        .iter()
        .map(|a| LedgerRecord {
            filename: a.filename.clone(),
            checksum: a.checksum.clone(),
        })
        .collect();
    let drift = detect_drift(migrations, &records);

    let recorded: HashSet<&str> = applied.iter().map(|a| a.filename.as_str()).collect();
    let pending = migrations
        .iter()
        .filter(|m| !recorded.contains(m.filename.as_str()))
        .map(|m| m.filename.clone())
        .collect();

    Ok(LedgerStatus {
        initialized,
        applied,
        pending,
        drift,
    })
}

async fn read_ledger<C>(conn: &mut C) -> Result<(bool, Vec<AppliedMigration>), DbError>
where
    C: DbConnection,
{
    if !conn.ledger_exists().await? {
        return Ok((false, Vec::new()));
    }
    Ok((true, conn.applied_migrations().await?))
}

pub fn status_lines(ui: &Ui, migrations: &[Migration], status: &LedgerStatus) -> Vec<String> {
    let style = ui.style();
    let mut lines = Vec::new();

    if !status.initialized {
        lines.push(ui.warn_line("ledger not initialized; run `strata migrate` first"));
    }

    let last = status
        .last_applied()
        .map(|a| format!("{} ({})", a.filename, a.applied_at.format("%Y-%m-%d %H:%M:%S UTC")))
        .unwrap_or_else(|| "none".to_string());

    lines.push(ui.kv("local files", &migrations.len().to_string()));
    lines.push(ui.kv("applied", &status.applied.len().to_string()));
    lines.push(ui.kv("pending", &status.pending.len().to_string()));
    lines.push(ui.kv("last applied", &last));

    if !status.pending.is_empty() {
        output_section(&mut lines, "Pending");
        for filename in &status.pending {
            lines.push(ui.item(&style.arrow(), filename, "pending"));
        }
    }

    if !status.drift.is_clean() {
        output_section(&mut lines, "Drift");
        for problem in status.drift.mismatched.iter().chain(&status.drift.out_of_order) {
            let (filename, detail) = match problem {
                MigrationDriftError::ChecksumMismatch {
                    filename,
                    recorded,
                    actual,
                } => (
                    filename,
                    format!(
                        "checksum {} != {}",
                        checksum::short(recorded),
                        checksum::short(actual)
                    ),
                ),
                MigrationDriftError::OutOfOrder {
                    filename,
                    latest_applied,
                } => (filename, format!("sorts before applied {latest_applied}")),
            };
            lines.push(ui.item(&style.fail(), filename, &detail));
        }
        for filename in &status.drift.missing_files {
            lines.push(ui.item(&style.warn(), filename, "recorded but missing on disk"));
        }
    }

    lines
}

fn output_section(lines: &mut Vec<String>, title: &str) {
    lines.push(String::new());
    lines.push(format!("{title}:"));
}
