//! In-process stand-in for a database, used by tests.
//!
//! Scripts are not interpreted. A script either succeeds and is appended to
//! the committed log when its transaction commits, or fails because it
//! contains a substring registered with [`MemoryDatabase::fail_when_contains`].

use crate::contract::{DbConnection, DbTransaction};
use crate::error::DbError;
use crate::ledger::{AppliedMigration, LedgerEntry};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    executed: Vec<String>,
    committed: Vec<String>,
    ledger: Option<Vec<AppliedMigration>>,
    failures: Vec<(String, String)>,
    ledger_failure: Option<String>,
    rollback_failure: Option<String>,
    connections_opened: usize,
    connections_closed: usize,
}

/// Shared handle to the in-memory state. Clones observe the same data, so a
/// test keeps one handle while the sequencer owns a connection.
#[derive(Debug, Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connect(&self) -> MemoryConnection {
        self.lock().connections_opened += 1;
        MemoryConnection {
            state: Arc::clone(&self.state),
        }
    }

    /// Any script containing `needle` fails with `message`.
    pub fn fail_when_contains(&self, needle: impl Into<String>, message: impl Into<String>) {
        self.lock().failures.push((needle.into(), message.into()));
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn fail_ledger(&self, message: impl Into<String>) {
        self.lock().ledger_failure = Some(message.into());
    }

    pub fn fail_rollback(&self, message: impl Into<String>) {
        self.lock().rollback_failure = Some(message.into());
    }

    /// Every script handed to the database, committed or not, in call order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Scripts whose transaction committed, in commit order.
    pub fn committed(&self) -> Vec<String> {
        self.lock().committed.clone()
    }

    pub fn ledger(&self) -> Vec<AppliedMigration> {
        self.lock().ledger.clone().unwrap_or_default()
    }

    pub fn ledger_exists(&self) -> bool {
        self.lock().ledger.is_some()
    }

    pub fn connections_opened(&self) -> usize {
        self.lock().connections_opened
    }

    pub fn connections_closed(&self) -> usize {
        self.lock().connections_closed
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct MemoryConnection {
    state: Arc<Mutex<MemoryState>>,
}

pub struct MemoryTransaction<'a> {
    state: &'a Mutex<MemoryState>,
    scripts: Vec<String>,
    entries: Vec<LedgerEntry>,
}

#[async_trait]
impl DbConnection for MemoryConnection {
    async fn begin(&mut self) -> Result<Box<dyn DbTransaction + '_>, DbError> {
        Ok(Box::new(MemoryTransaction {
            state: &self.state,
            scripts: Vec::new(),
            entries: Vec::new(),
        }))
    }

    async fn ensure_ledger(&mut self) -> Result<(), DbError> {
        let mut state = lock(&self.state);
        if let Some(message) = &state.ledger_failure {
            return Err(DbError::ledger("create", message.clone()));
        }
        state.ledger.get_or_insert_with(Vec::new);
        Ok(())
    }

    async fn ledger_exists(&mut self) -> Result<bool, DbError> {
        let state = lock(&self.state);
        if let Some(message) = &state.ledger_failure {
            return Err(DbError::ledger("exists", message.clone()));
        }
        Ok(state.ledger.is_some())
    }

    async fn applied_migrations(&mut self) -> Result<Vec<AppliedMigration>, DbError> {
        let state = lock(&self.state);
        if let Some(message) = &state.ledger_failure {
            return Err(DbError::ledger("select", message.clone()));
        }

        let mut rows = state
            .ledger
            .clone()
            .ok_or_else(|| DbError::ledger("select", "relation \"strata_migrations\" does not exist"))?;
        rows.sort_by(|a, b| a.filename.cmp(&b.filename));
        Ok(rows)
    }

    async fn close(self) -> Result<(), DbError> {
        lock(&self.state).connections_closed += 1;
        Ok(())
    }
}

#[async_trait]
impl DbTransaction for MemoryTransaction<'_> {
    async fn execute_script(&mut self, sql: &str) -> Result<(), DbError> {
        let mut state = lock(self.state);
        state.executed.push(sql.to_string());

        let failure = state
            .failures
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, message)| message.clone());

        match failure {
            Some(message) => Err(DbError::Script { message }),
            None => {
                self.scripts.push(sql.to_string());
                Ok(())
            }
        }
    }

    async fn record_migration(&mut self, entry: &LedgerEntry) -> Result<(), DbError> {
        let state = lock(self.state);
        let exists = state.ledger.as_ref().is_some_and(|rows| {
            rows.iter().any(|row| row.filename == entry.filename)
        }) || self.entries.iter().any(|e| e.filename == entry.filename);

        if state.ledger.is_none() {
            return Err(DbError::ledger(
                "insert",
                "relation \"strata_migrations\" does not exist",
            ));
        }
        if exists {
            return Err(DbError::ledger(
                "insert",
                format!(
                    "duplicate key value violates unique constraint \"strata_migrations_pkey\" ({})",
                    entry.filename
                ),
            ));
        }

        self.entries.push(entry.clone());
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let this = *self;
        let mut state = lock(this.state);
        state.committed.extend(this.scripts);

        let now = Utc::now();
        let ledger = state.ledger.get_or_insert_with(Vec::new);
        ledger.extend(this.entries.into_iter().map(|e| AppliedMigration {
            filename: e.filename,
            checksum: e.checksum,
            applied_at: now,
            execution_time_ms: e.execution_time_ms,
            run_id: e.run_id,
        }));
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        let state = lock(self.state);
        match &state.rollback_failure {
            Some(message) => Err(DbError::transaction("rollback", message.clone())),
            None => Ok(()),
        }
    }
}
