use core::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStage {
    Lookup,
    CreateAuthUser,
    InsertProfile,
}

impl ProvisionStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionStage::Lookup => "lookup",
            ProvisionStage::CreateAuthUser => "create_auth_user",
            ProvisionStage::InsertProfile => "insert_profile",
        }
    }
}

impl fmt::Display for ProvisionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProvisionError {
    #[error("{operation} request failed: {message}")]
    Http { operation: String, message: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    Status {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("{operation} returned an unexpected body: {message}")]
    Decode { operation: String, message: String },
}
