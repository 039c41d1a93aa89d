//! Coinfolio CLI - Command-line interface for Coinfolio
//!
//! Provides commands for:
//! - Browsing the coin catalog in a chosen currency
//! - Viewing holdings and portfolio totals
//! - Adding, editing and removing holdings
//! - Inspecting the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    add::AddCommand, catalog::CatalogCommand, config::ConfigCommand, holdings::HoldingsCommand,
    remove::RemoveCommand, set_amount::SetAmountCommand, Invocation,
};

#[derive(Debug, Parser)]
#[command(
    name = "coinfolio",
    version,
    about = "Cached crypto prices and portfolio tracking"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the coin catalog
    Catalog(CatalogCommand),
    /// Show holdings and portfolio totals
    Holdings(HoldingsCommand),
    /// Start tracking a catalog coin
    Add(AddCommand),
    /// Set or clear the owned amount of a holding
    SetAmount(SetAmountCommand),
    /// Stop tracking one or more coins
    Remove(RemoveCommand),
    /// View and manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let invocation = Invocation::new(cli.config.clone(), cli.json);

    // Setup tracing
    let filter = match cli.verbose {
        0 => invocation.config().logging.level.clone(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Catalog(cmd) => cmd.execute(&invocation).await,
        Commands::Holdings(cmd) => cmd.execute(&invocation).await,
        Commands::Add(cmd) => cmd.execute(&invocation).await,
        Commands::SetAmount(cmd) => cmd.execute(&invocation).await,
        Commands::Remove(cmd) => cmd.execute(&invocation).await,
        Commands::Config(cmd) => cmd.execute(&invocation).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["coinfolio", "holdings", "--fiat", "eur", "--json", "-vv"])
            .unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Holdings(cmd) => assert_eq!(cmd.fiat.as_deref(), Some("eur")),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_remove_requires_ids() {
        assert!(Cli::try_parse_from(["coinfolio", "remove"]).is_err());
    }
}
