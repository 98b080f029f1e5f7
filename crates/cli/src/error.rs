use core::fmt;

/// Process exit status. Anything but `Success` means the run did not do all
/// it set out to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    Configuration = 1,
    MigrationFailed = 2,
    DiscoveryFailed = 3,
    ConnectionFailed = 4,
    ProvisioningFailed = 5,
    LedgerFailed = 6,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

#[derive(Debug, Clone)]
pub struct CliError {
    code: ExitCode,
    title: String,
    reason: Option<String>,
    meaning: Option<String>,
    action: Option<String>,
}

impl CliError {
    fn new(code: ExitCode, title: impl Into<String>) -> Self {
        Self {
            code,
            title: title.into(),
            reason: None,
            meaning: None,
            action: None,
        }
    }

    pub fn configuration(title: impl Into<String>) -> Self {
        Self::new(ExitCode::Configuration, title)
    }

    pub fn migration_failed(title: impl Into<String>) -> Self {
        Self::new(ExitCode::MigrationFailed, title)
    }

    pub fn discovery_failed(title: impl Into<String>) -> Self {
        Self::new(ExitCode::DiscoveryFailed, title)
    }

    pub fn connection_failed(title: impl Into<String>) -> Self {
        Self::new(ExitCode::ConnectionFailed, title)
    }

    pub fn provisioning_failed(title: impl Into<String>) -> Self {
        Self::new(ExitCode::ProvisioningFailed, title)
    }

    pub fn ledger_failed(title: impl Into<String>) -> Self {
        Self::new(ExitCode::LedgerFailed, title)
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_meaning(mut self, meaning: impl Into<String>) -> Self {
        self.meaning = Some(meaning.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn code(&self) -> ExitCode {
        self.code
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn meaning(&self) -> Option<&str> {
        self.meaning.as_deref()
    }

    pub fn action(&self) -> Option<&str> {
        self.action.as_deref()
    }

    pub fn exit_code(&self) -> i32 {
        self.code.as_i32()
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.title)
    }
}

impl std::error::Error for CliError {}
