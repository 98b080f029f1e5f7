//! Settings resolved once at startup and handed to the commands. Nothing
//! below this layer reads the process environment.

use crate::args::{MigrateArgs, SeedUsersArgs};
use core::time::Duration;
use std::path::PathBuf;
use strata_executor::{ExecutionMode, LedgerPolicy, SequencerOptions};
use strata_provision::SupabaseConfig;
use thiserror::Error;

pub const DATABASE_URL_ENV: &str = "DATABASE_URL";
pub const LEGACY_DATABASE_URL_ENV: &str = "SUPABASE_DB_URL";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("DATABASE_URL is required")]
    MissingDatabaseUrl,

    #[error("{name} is required")]
    MissingSetting { name: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrateConfig {
    pub database_url: String,
    pub migrations_dir: PathBuf,
    pub options: SequencerOptions,
}

impl MigrateConfig {
    pub fn resolve(
        database_url: Option<&str>,
        args: &MigrateArgs,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let database_url = resolve_database_url(database_url, lookup)?;

        let mode = if args.dry_run {
            ExecutionMode::DryRun
        } else {
            ExecutionMode::Apply
        };
        let ledger = if args.no_ledger {
            LedgerPolicy::Disabled
        } else {
            LedgerPolicy::Enabled
        };

        Ok(Self {
            database_url,
            migrations_dir: args.migrations_dir.clone(),
            options: SequencerOptions {
                mode,
                ledger,
                pause: Duration::from_millis(args.pause_ms),
            },
        })
    }
}

/// An explicit value wins, then the legacy variable. Blank values count as
/// unset.
pub fn resolve_database_url(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<String, ConfigError> {
    explicit
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| lookup(LEGACY_DATABASE_URL_ENV).filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
        .ok_or(ConfigError::MissingDatabaseUrl)
}

pub fn supabase_config(args: &SeedUsersArgs) -> Result<SupabaseConfig, ConfigError> {
    let url = non_blank(args.supabase_url.as_deref()).ok_or(ConfigError::MissingSetting {
        name: "SUPABASE_URL",
    })?;
    let key = non_blank(args.service_role_key.as_deref()).ok_or(ConfigError::MissingSetting {
        name: "SUPABASE_SERVICE_ROLE_KEY",
    })?;

    Ok(SupabaseConfig::new(url, key))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Reads a variable from the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}
