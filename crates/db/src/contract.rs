//! The seam between the sequencer and a concrete database.
//!
//! A connection hands out at most one transaction at a time (the borrow of
//! `&mut self` enforces it). Dropping a transaction without committing must
//! leave nothing behind, matching what the Postgres driver does on drop.

use crate::error::DbError;
use crate::ledger::{AppliedMigration, LedgerEntry};
use async_trait::async_trait;

#[async_trait]
pub trait DbConnection: Send {
    async fn begin(&mut self) -> Result<Box<dyn DbTransaction + '_>, DbError>;

    /// Creates the ledger table when it does not exist yet.
    async fn ensure_ledger(&mut self) -> Result<(), DbError>;

    /// Whether the ledger table is present. Creates nothing.
    async fn ledger_exists(&mut self) -> Result<bool, DbError>;

    /// Ledger rows ordered by filename. Reads nothing but the ledger table,
    /// which must already exist.
    async fn applied_migrations(&mut self) -> Result<Vec<AppliedMigration>, DbError>;

    async fn close(self) -> Result<(), DbError>;
}

#[async_trait]
pub trait DbTransaction: Send {
    /// Runs `sql` as one script; it may hold several statements.
    async fn execute_script(&mut self, sql: &str) -> Result<(), DbError>;

    async fn record_migration(&mut self, entry: &LedgerEntry) -> Result<(), DbError>;

    async fn commit(self: Box<Self>) -> Result<(), DbError>;

    async fn rollback(self: Box<Self>) -> Result<(), DbError>;
}
