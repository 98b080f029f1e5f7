use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DbError {
    #[error("invalid connection string: {message}")]
    InvalidConnectionString { message: String },

    #[error("connect failed: {message}")]
    Connect { message: String },

    #[error("script execution failed: {message}")]
    Script { message: String },

    #[error("transaction {operation} failed: {message}")]
    Transaction { operation: String, message: String },

    #[error("ledger {operation} failed: {message}")]
    Ledger { operation: String, message: String },

    #[error("closing connection failed: {message}")]
    Close { message: String },
}

impl DbError {
    pub fn transaction(operation: &str, message: impl Into<String>) -> Self {
        DbError::Transaction {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn ledger(operation: &str, message: impl Into<String>) -> Self {
        DbError::Ledger {
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}
