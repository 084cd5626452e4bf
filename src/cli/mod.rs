// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! CLI command definitions and handlers
//!
//! Defines the command-line interface for reconflow.

pub mod check;
pub mod plan;
pub mod run;
pub mod status;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Staged recon pipeline orchestrator
///
/// Runs a fixed sequence of external recon tools against a target,
/// staging every stage's output as a resumable artifact.
#[derive(Parser, Debug)]
#[clap(
    name = "reconflow",
    version,
    about = "Staged recon pipeline orchestrator with resumable artifacts",
    long_about = None,
    after_help = "Examples:\n\
        reconflow check                 Verify required tools are on PATH\n\
        reconflow run example.com       Run the pipeline against a target\n\
        reconflow run example.com --force   Re-run every stage from scratch\n\
        reconflow plan                  Show the stage table and dependencies\n\
        reconflow status                Show which artifacts are staged\n\n\
        See 'reconflow <command> --help' for more information on a specific command."
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[clap(short, long, global = true)]
    pub verbose: bool,

    /// Change to directory before executing
    #[clap(short = 'C', long, global = true, value_name = "DIR")]
    pub directory: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the pipeline against a target
    Run {
        /// Target identifier (e.g. a domain name)
        target: String,

        /// Ignore existing artifacts and re-execute every stage
        #[clap(long)]
        force: bool,

        /// Show the execution plan without running anything
        #[clap(long)]
        dry_run: bool,

        /// Summary output format (text, json)
        #[clap(short, long, default_value = "text")]
        format: SummaryFormat,
    },

    /// Check that required external tools are resolvable
    Check,

    /// Show the stage table and its dependency graph
    Plan {
        /// Output format (text, mermaid, dot)
        #[clap(short, long, default_value = "text")]
        format: PlanFormat,
    },

    /// Show which stage artifacts are currently staged
    Status,
}

/// Output format for the run summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryFormat {
    Text,
    Json,
}

impl std::str::FromStr for SummaryFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown summary format: {}", s)),
        }
    }
}

/// Plan output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Text,
    Mermaid,
    Dot,
}

impl std::str::FromStr for PlanFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "mermaid" => Ok(Self::Mermaid),
            "dot" => Ok(Self::Dot),
            _ => Err(format!("Unknown plan format: {}", s)),
        }
    }
}
