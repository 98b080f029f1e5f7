#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Apply,
    DryRun,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Apply => "apply",
            ExecutionMode::DryRun => "dry_run",
        }
    }
}

/// Whether the sequencer consults and writes the `strata_migrations` ledger.
///
/// `Disabled` re-runs every discovered file on every invocation, so it only
/// suits scripts that guard themselves (`CREATE TABLE IF NOT EXISTS` and the
/// like).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedgerPolicy {
    #[default]
    Enabled,
    Disabled,
}

impl LedgerPolicy {
    pub fn is_enabled(&self) -> bool {
        matches!(self, LedgerPolicy::Enabled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerPolicy::Enabled => "enabled",
            LedgerPolicy::Disabled => "disabled",
        }
    }
}
