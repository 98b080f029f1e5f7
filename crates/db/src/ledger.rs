use chrono::{DateTime, Utc};
use uuid::Uuid;

pub const LEDGER_TABLE: &str = "strata_migrations";

pub(crate) const SQL_CREATE_LEDGER: &str = "
CREATE TABLE IF NOT EXISTS strata_migrations (
    filename TEXT PRIMARY KEY,
    checksum TEXT NOT NULL,
    applied_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    execution_time_ms INTEGER NOT NULL,
    run_id UUID NOT NULL
)
";

pub(crate) const SQL_LEDGER_EXISTS: &str = "SELECT to_regclass('strata_migrations') IS NOT NULL";

pub(crate) const SQL_SELECT_APPLIED: &str = "
SELECT filename, checksum, applied_at, execution_time_ms, run_id
FROM strata_migrations
ORDER BY filename
";

pub(crate) const SQL_INSERT_APPLIED: &str = "
INSERT INTO strata_migrations (
    filename,
    checksum,
    applied_at,
    execution_time_ms,
    run_id
)
VALUES ($1, $2, now(), $3, $4)
";

/// One row of the ledger table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub filename: String,
    pub checksum: String,
    pub applied_at: DateTime<Utc>,
    pub execution_time_ms: i32,
    pub run_id: Uuid,
}

/// What the sequencer writes for a migration it just ran. The timestamp is
/// taken by the database at insert time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub filename: String,
    pub checksum: String,
    pub execution_time_ms: i32,
    pub run_id: Uuid,
}
