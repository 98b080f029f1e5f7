use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationDiscoveryError {
    #[error("migrations directory not found: {dir}")]
    DirectoryNotFound { dir: String },

    #[error("migrations path is not a directory: {dir}")]
    NotADirectory { dir: String },

    #[error("I/O error while reading '{path}': {message}")]
    Io { path: String, message: String },

    #[error("migration file '{path}' is not valid UTF-8: {message}")]
    InvalidEncoding { path: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MigrationDriftError {
    #[error(
        "migration drift detected: checksum mismatch for '{filename}' (ledger={recorded}, file={actual})"
    )]
    ChecksumMismatch {
        filename: String,
        recorded: String,
        actual: String,
    },

    #[error(
        "migration '{filename}' is pending but sorts before '{latest_applied}', which is already applied"
    )]
    OutOfOrder {
        filename: String,
        latest_applied: String,
    },
}
