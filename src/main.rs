//! Caskhash CLI entry point that dispatches to subcommands.

use caskhash::cli::{Cli, Commands};
use caskhash::config::ConfigManager;
use caskhash::error::CaskhashResult;
use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> CaskhashResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await;

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG takes precedence
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("caskhash=warn"),
        1 => EnvFilter::new("caskhash=info"),
        _ => EnvFilter::new("caskhash=debug"),
    });
    let json_logs = matches!(&config, Ok(c) if c.general.log_format == "json");

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if json_logs {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    let config = config?;

    match cli.command {
        Commands::Resolve(args) => caskhash::cli::commands::resolve(args, &config).await,
        Commands::Cache(args) => caskhash::cli::commands::cache(args, &config).await,
        Commands::Config(args) => {
            caskhash::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
