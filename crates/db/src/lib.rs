pub mod contract;
pub mod error;
pub mod ledger;
pub mod postgres;

#[cfg(any(test, feature = "memory"))]
pub mod memory;

pub use contract::{DbConnection, DbTransaction};
pub use error::DbError;
pub use ledger::{AppliedMigration, LedgerEntry, LEDGER_TABLE};
pub use postgres::PgDatabase;
