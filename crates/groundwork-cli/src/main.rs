//! Groundwork CLI
//!
//! Keep a document corpus indexed and answer questions grounded on it.

use anyhow::Result;
use clap::Parser;
use groundwork_core::error::exit_codes;
use groundwork_core::{Config, GroundworkError};
use std::process::ExitCode;

mod app;
mod commands;
mod output;

use app::{Cli, Commands};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::INFO
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            let code = e
                .downcast_ref::<GroundworkError>()
                .map(GroundworkError::exit_code)
                .unwrap_or(exit_codes::GENERAL_ERROR);
            ExitCode::from(code as u8)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.docs_dir {
        config.corpus.root = dir;
    }

    match cli.command {
        Commands::Status => commands::status::run(&config, cli.format).await,
        Commands::Reindex(args) => commands::reindex::run(args, &config, cli.format).await,
        Commands::Context(args) => commands::context::run(args, &config, cli.format).await,
        Commands::Chat(args) => commands::chat::run(args, &config, cli.format).await,
        Commands::Health => commands::health::run(&config, cli.format).await,
        Commands::Ls => commands::ls::run(&config, cli.format),
        Commands::Show(args) => commands::show::run(args, &config, cli.format),
        Commands::Save(args) => commands::save::run(args, &config, cli.format).await,
    }
}
