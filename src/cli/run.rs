// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Run command - execute the pipeline

use colored::Colorize;
use miette::Result;

use crate::cli::SummaryFormat;
use crate::config::RunConfig;
use crate::errors::install_hint;
use crate::gateway::SystemGateway;
use crate::pipeline::{
    build_catalog, PipelineOutcome, PipelineRunner, RunOptions, RunSummary, StageDag, StageState,
    REQUIRED_TOOLS,
};
use crate::preflight;
use crate::store::ArtifactStore;
use crate::utils;

/// Run the pipeline
pub async fn run(
    target: String,
    force: bool,
    dry_run: bool,
    format: SummaryFormat,
    verbose: bool,
) -> Result<()> {
    // targets are free-form identifiers; non-empty is the whole contract
    if target.trim().is_empty() {
        return Err(miette::miette!("Target must not be empty"));
    }

    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let config = RunConfig::load(&working_dir)?;

    let catalog = build_catalog(&target, &config);
    let store = ArtifactStore::new(working_dir.join(&config.root));

    if dry_run {
        let dag = StageDag::build(&catalog)?;
        println!();
        println!("{}: {}", "Target".bold(), target);
        println!("{}", "═".repeat(50));
        print!("{}", dag.to_text(&catalog));
        return Ok(());
    }

    // one preflight pass, surfaced before anything runs
    let report = preflight::check(REQUIRED_TOOLS.iter().copied());
    if !report.all_present() {
        utils::print_section("Missing tools");
        for tool in report.missing() {
            utils::print_error(tool);
            println!("    {}", install_hint(tool).cyan());
        }
    }

    println!();
    println!("{}: {}", "Target".bold(), target);
    println!("{}: {}", "Staging".bold(), store.root().display());
    println!();

    let gateway = SystemGateway::new();
    let runner = PipelineRunner::new(&catalog, &store, &gateway);
    let options = RunOptions { force, verbose };

    let summary = runner.run(&target, &report, &options).await?;

    match format {
        SummaryFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)
                .map_err(|e| miette::miette!("Failed to serialize summary: {}", e))?;
            println!("{}", json);
        }
        SummaryFormat::Text => print_summary(&summary),
    }

    if summary.outcome == PipelineOutcome::Aborted {
        let stage = summary.aborted_stage.as_deref().unwrap_or("unknown");
        return Err(miette::miette!("Pipeline aborted at stage '{}'", stage));
    }

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    let seconds = summary.duration_ms as f64 / 1000.0;

    println!();
    match summary.outcome {
        PipelineOutcome::Completed if summary.failed == 0 => {
            println!(
                "{}",
                format!("Pipeline completed successfully in {:.1}s", seconds).green()
            );
        }
        PipelineOutcome::Completed => {
            println!(
                "{}",
                format!(
                    "Pipeline completed in {:.1}s with {} stage failure(s)",
                    seconds, summary.failed
                )
                .yellow()
            );
        }
        PipelineOutcome::Aborted => {
            println!(
                "{}",
                format!(
                    "Pipeline aborted at stage '{}' after {:.1}s",
                    summary.aborted_stage.as_deref().unwrap_or("unknown"),
                    seconds
                )
                .red()
            );
        }
    }

    println!(
        "  {} succeeded, {} skipped, {} failed",
        summary.succeeded, summary.skipped, summary.failed
    );

    let failures: Vec<_> = summary
        .stages
        .iter()
        .filter(|stage| stage.state == StageState::Failed)
        .collect();
    if !failures.is_empty() {
        utils::print_section("Failures");
        for stage in failures {
            if let Some(ref failure) = stage.failure {
                utils::print_error(&format!("{}: {}", stage.name, failure.detail));
            }
        }
    }

    if !summary.artifacts.is_empty() {
        utils::print_section("Artifacts");
        for artifact in &summary.artifacts {
            println!("  - {}", artifact);
        }
    }
}
