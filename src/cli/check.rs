// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Check command - preflight the execution environment
//!
//! Read-only and recheckable: reports pass/fail per tool and always
//! exits successfully so it can be scripted as a probe.

use colored::Colorize;
use miette::Result;

use crate::errors::install_hint;
use crate::pipeline::REQUIRED_TOOLS;
use crate::preflight;
use crate::utils;

/// Check that required external tools are resolvable
pub async fn run(verbose: bool) -> Result<()> {
    utils::print_header("Preflight");

    let report = preflight::check(REQUIRED_TOOLS.iter().copied());

    for (tool, path) in report.iter() {
        match path {
            Some(path) if verbose => {
                utils::print_success(&format!("{} ({})", tool, path.display()));
            }
            Some(_) => utils::print_success(tool),
            None => {
                utils::print_error(tool);
                println!("    {}", install_hint(tool).dimmed());
            }
        }
    }

    println!();
    let missing = report.missing().len();
    if missing == 0 {
        println!(
            "{}",
            format!("All {} tools available", report.len()).green()
        );
    } else {
        println!(
            "{}",
            format!("{} of {} tools missing", missing, report.len()).yellow()
        );
    }

    Ok(())
}
