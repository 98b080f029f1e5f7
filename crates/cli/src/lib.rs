pub mod args;
pub mod config;
pub mod error;
pub mod error_view;
pub mod logging;
pub mod migrate;
pub mod output;
pub mod seed_users;
pub mod status;
pub mod style;
pub mod ui;

pub use args::{Cli, Command, MigrateArgs, SeedUsersArgs, StatusArgs};
pub use error::{CliError, ExitCode};
