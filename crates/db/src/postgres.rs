use crate::contract::{DbConnection, DbTransaction};
use crate::error::DbError;
use crate::ledger::{
    AppliedMigration, LedgerEntry, SQL_CREATE_LEDGER, SQL_INSERT_APPLIED, SQL_LEDGER_EXISTS,
    SQL_SELECT_APPLIED,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, Executor, PgConnection, Postgres};
use std::str::FromStr;
use uuid::Uuid;

/// A single exclusive Postgres connection.
pub struct PgDatabase {
    conn: PgConnection,
}

impl PgDatabase {
    /// Parses `database_url` before dialing, so a malformed string is told
    /// apart from an unreachable server.
    pub async fn connect(database_url: &str) -> Result<Self, DbError> {
        let options = PgConnectOptions::from_str(database_url).map_err(|e| {
            DbError::InvalidConnectionString {
                message: e.to_string(),
            }
        })?;

        let conn = PgConnection::connect_with(&options)
            .await
            .map_err(|e| DbError::Connect {
                message: e.to_string(),
            })?;

        tracing::debug!("database connection established");
        Ok(Self { conn })
    }
}

pub struct PgMigrationTransaction<'c> {
    tx: sqlx::Transaction<'c, Postgres>,
}

#[async_trait]
impl DbConnection for PgDatabase {
    async fn begin(&mut self) -> Result<Box<dyn DbTransaction + '_>, DbError> {
        let tx = self
            .conn
            .begin()
            .await
            .map_err(|e| DbError::transaction("begin", e.to_string()))?;

        Ok(Box::new(PgMigrationTransaction { tx }))
    }

    async fn ensure_ledger(&mut self) -> Result<(), DbError> {
        let conn: &mut PgConnection = &mut self.conn;
        conn.execute(sqlx::query(SQL_CREATE_LEDGER))
            .await
            .map_err(|e| DbError::ledger("create", e.to_string()))?;

        Ok(())
    }

    async fn ledger_exists(&mut self) -> Result<bool, DbError> {
        sqlx::query_scalar::<_, bool>(SQL_LEDGER_EXISTS)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| DbError::ledger("exists", e.to_string()))
    }

    async fn applied_migrations(&mut self) -> Result<Vec<AppliedMigration>, DbError> {
        let rows: Vec<(String, String, DateTime<Utc>, i32, Uuid)> =
            sqlx::query_as(SQL_SELECT_APPLIED)
                .fetch_all(&mut self.conn)
                .await
                .map_err(|e| DbError::ledger("select", e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(
                |(filename, checksum, applied_at, execution_time_ms, run_id)| AppliedMigration {
                    filename,
                    checksum,
                    applied_at,
                    execution_time_ms,
                    run_id,
                },
            )
            .collect())
    }

    async fn close(self) -> Result<(), DbError> {
        self.conn.close().await.map_err(|e| DbError::Close {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl DbTransaction for PgMigrationTransaction<'_> {
    async fn execute_script(&mut self, sql: &str) -> Result<(), DbError> {
        // Simple-query protocol: the whole file runs as one multi-statement script.
        let conn: &mut PgConnection = &mut self.tx;
        conn.execute(sqlx::raw_sql(sql))
            .await
            .map_err(|e| DbError::Script {
                message: e.to_string(),
            })?;

        Ok(())
    }

    async fn record_migration(&mut self, entry: &LedgerEntry) -> Result<(), DbError> {
        sqlx::query(SQL_INSERT_APPLIED)
            .bind(&entry.filename)
            .bind(&entry.checksum)
            .bind(entry.execution_time_ms)
            .bind(entry.run_id)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| DbError::ledger("insert", e.to_string()))?;

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), DbError> {
        let this = *self;
        this.tx
            .commit()
            .await
            .map_err(|e| DbError::transaction("commit", e.to_string()))
    }

    async fn rollback(self: Box<Self>) -> Result<(), DbError> {
        let this = *self;
        this.tx
            .rollback()
            .await
            .map_err(|e| DbError::transaction("rollback", e.to_string()))
    }
}
