use clap::Parser;
use strata_cli::{logging, Cli, Command};

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    logging::init(cli.verbose);

    let database_url = cli.database_url.as_deref();
    let result = match &cli.command {
        Command::Migrate(args) => strata_cli::migrate::run(args, database_url).await,
        Command::Status(args) => strata_cli::status::run(args, database_url).await,
        Command::SeedUsers(args) => strata_cli::seed_users::run(args).await,
    };

    if let Err(err) = result {
        strata_cli::error_view::print(&err);
        std::process::exit(err.exit_code());
    }
}
