use std::path::PathBuf;

/// A migration script discovered on disk.
///
/// `filename` is the identity of the migration: it is what gets sorted, what
/// the ledger records, and what shows up in reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    pub filename: String,
    pub path: PathBuf,
    pub checksum: String,
    pub sql: String,
}

impl Migration {
    pub fn new(filename: String, path: PathBuf, checksum: String, sql: String) -> Self {
        Self {
            filename,
            path,
            checksum,
            sql,
        }
    }

    /// Builds a migration from in-memory contents, computing the checksum.
    pub fn from_sql(filename: impl Into<String>, sql: impl Into<String>) -> Self {
        let filename = filename.into();
        let sql = sql.into();
        let checksum = crate::checksum::sha256_hex(sql.as_bytes());
        Self {
            path: PathBuf::from(&filename),
            filename,
            checksum,
            sql,
        }
    }
}
