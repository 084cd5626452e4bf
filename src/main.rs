// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! reconflow - Staged Recon Pipeline Orchestrator
//!
//! Run a fixed recon tool chain against a target with resumable,
//! artifact-staged execution.

use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reconflow::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reconflow=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let cli = Cli::parse();

    // Change to specified directory if provided
    if let Some(ref dir) = cli.directory {
        std::env::set_current_dir(dir).map_err(|e| {
            miette::miette!("Failed to change to directory '{}': {}", dir.display(), e)
        })?;
    }

    // Dispatch to command handlers
    match cli.command {
        Commands::Run {
            target,
            force,
            dry_run,
            format,
        } => reconflow::cli::run::run(target, force, dry_run, format, cli.verbose).await,
        Commands::Check => reconflow::cli::check::run(cli.verbose).await,
        Commands::Plan { format } => reconflow::cli::plan::run(format, cli.verbose).await,
        Commands::Status => reconflow::cli::status::run(cli.verbose).await,
    }
}
