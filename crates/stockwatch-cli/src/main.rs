mod check;
mod validate;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "stockwatch-cli")]
#[command(about = "One-shot commands for the store pickup availability watcher")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one availability check and print the snapshot as JSON
    Check {
        /// Skip SMS delivery; availability is still fetched and printed
        #[arg(long)]
        dry_run: bool,
    },
    /// Send the test SMS to the configured recipient
    TestSms,
    /// Load the environment configuration and catalog and report problems
    Validate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if matches!(cli.command, Commands::Validate) {
        return validate::run_validate();
    }

    let config = stockwatch_core::load_app_config_from_env()?;
    // stdout carries command output; logs go to stderr.
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check { dry_run } => check::run_check(&config, dry_run).await,
        Commands::TestSms => check::run_test_sms(&config).await,
        Commands::Validate => Ok(()),
    }
}
