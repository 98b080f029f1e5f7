use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Apply SQL migrations and provision test accounts")]
pub struct Cli {
    /// Postgres connection string. Falls back to SUPABASE_DB_URL.
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Apply pending migrations in filename order, stopping at the first failure.
    Migrate(MigrateArgs),
    /// Show which migrations the ledger has recorded.
    Status(StatusArgs),
    /// Create the role-tagged test accounts and their profile rows.
    SeedUsers(SeedUsersArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct MigrateArgs {
    #[arg(long, env = "STRATA_MIGRATIONS_DIR", default_value = "migrations")]
    pub migrations_dir: PathBuf,

    /// Run every pending file in one transaction and roll it back.
    #[arg(long)]
    pub dry_run: bool,

    /// Re-run every file without consulting or writing the ledger.
    #[arg(long)]
    pub no_ledger: bool,

    /// Milliseconds to wait between two migrations.
    #[arg(long, default_value_t = 0)]
    pub pause_ms: u64,
}

#[derive(Parser, Debug, Clone)]
pub struct StatusArgs {
    #[arg(long, env = "STRATA_MIGRATIONS_DIR", default_value = "migrations")]
    pub migrations_dir: PathBuf,
}

#[derive(Parser, Debug, Clone)]
pub struct SeedUsersArgs {
    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: Option<String>,

    #[arg(long, env = "SUPABASE_SERVICE_ROLE_KEY", hide_env_values = true)]
    pub service_role_key: Option<String>,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}
