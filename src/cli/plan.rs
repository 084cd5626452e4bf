// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Plan command - show the stage table and dependency graph

use miette::Result;

use crate::cli::PlanFormat;
use crate::config::RunConfig;
use crate::pipeline::{build_catalog, StageDag};
use crate::utils;

/// Placeholder target for rendering; the stage table's shape does not
/// depend on the target value
const PLAN_TARGET: &str = "example.com";

/// Show the pipeline plan
pub async fn run(format: PlanFormat, _verbose: bool) -> Result<()> {
    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let config = RunConfig::load(&working_dir)?;

    let catalog = build_catalog(PLAN_TARGET, &config);
    let dag = StageDag::build(&catalog)?;

    match format {
        PlanFormat::Text => {
            utils::print_header("Pipeline plan");
            print!("{}", dag.to_text(&catalog));
            println!();
            println!(
                "{} stages, {} dependency edges",
                catalog.len(),
                dag.edge_count()
            );
        }
        PlanFormat::Mermaid => print!("{}", dag.to_mermaid(&catalog)),
        PlanFormat::Dot => print!("{}", dag.to_dot(&catalog)),
    }

    Ok(())
}
