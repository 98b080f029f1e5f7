use crate::error::MigrationDriftError;
use crate::model::Migration;
use std::collections::{HashMap, HashSet};

/// What the ledger remembers about one applied migration, as far as drift
/// detection cares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerRecord {
    pub filename: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Drift {
    /// Ledger rows whose file changed since it was applied.
    pub mismatched: Vec<MigrationDriftError>,
    /// Unapplied files that sort before the newest ledger row.
    pub out_of_order: Vec<MigrationDriftError>,
    /// Ledger rows with no file on disk anymore.
    pub missing_files: Vec<String>,
}

impl Drift {
    pub fn is_clean(&self) -> bool {
        self.mismatched.is_empty() && self.out_of_order.is_empty() && self.missing_files.is_empty()
    }

    /// Fails on the first checksum mismatch, then on the first out-of-order
    /// file. Missing files do not block a run.
    pub fn ensure_consistent(&self) -> Result<(), MigrationDriftError> {
        match self.mismatched.first().or_else(|| self.out_of_order.first()) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// Applying only files that sort after every ledger row keeps the database
/// history in filename order.
pub fn detect_drift(filesystem: &[Migration], ledger: &[LedgerRecord]) -> Drift {
    let fs_by_name: HashMap<&str, &Migration> = filesystem
        .iter()
        .map(|m| (m.filename.as_str(), m))
        .collect();

    let mut drift = Drift::default();
    for record in ledger {
        let Some(fsm) = fs_by_name.get(record.filename.as_str()) else {
            drift.missing_files.push(record.filename.clone());
            continue;
        };

        if fsm.checksum != record.checksum {
            drift.mismatched.push(MigrationDriftError::ChecksumMismatch {
                filename: record.filename.clone(),
                recorded: record.checksum.clone(),
                actual: fsm.checksum.clone(),
            });
        }
    }

    let applied: HashSet<&str> = ledger.iter().map(|r| r.filename.as_str()).collect();
    if let Some(latest) = ledger.iter().map(|r| r.filename.as_str()).max() {
        for m in filesystem {
            if !applied.contains(m.filename.as_str()) && m.filename.as_str() < latest {
                drift.out_of_order.push(MigrationDriftError::OutOfOrder {
                    filename: m.filename.clone(),
                    latest_applied: latest.to_string(),
                });
            }
        }
    }

    drift
}
