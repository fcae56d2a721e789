//! afip CLI - Command-line front end for AFIP web service authentication
//!
//! This CLI enables operators to:
//! - Authenticate against a service and print the credential payload
//! - Check whether the stored access ticket is fresh or stale
//! - Query a service's status operation

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod error;
mod logging;

use error::CliResult;

/// afip CLI - AFIP web service authentication
#[derive(Parser, Debug)]
#[command(name = "afip")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to a JSON configuration file
    #[arg(long, global = true, env = "AFIP_CONFIG")]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Authenticate and print the service credential
    Auth(commands::auth::AuthArgs),

    /// Show whether the stored access ticket is fresh
    Ticket(commands::ticket::TicketArgs),

    /// Query the service status operation
    Status(commands::status::StatusArgs),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = config::load(cli.config.as_deref())?;
    tracing::debug!(cuit = %config.cuit, production = config.production(), "Configuration loaded");

    match cli.command {
        Commands::Auth(args) => commands::auth::execute(args, &config).await,
        Commands::Ticket(args) => commands::ticket::execute(args, &config).await,
        Commands::Status(args) => commands::status::execute(args, &config).await,
    }
}
