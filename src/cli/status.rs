// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Status command - list staged artifacts
//!
//! The staging directory is the durable resume state; this surfaces it.

use colored::Colorize;
use miette::Result;
use std::time::Duration;

use crate::config::RunConfig;
use crate::pipeline::build_catalog;
use crate::store::ArtifactStore;
use crate::utils;

/// Show which stage artifacts are currently staged
pub async fn run(_verbose: bool) -> Result<()> {
    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let config = RunConfig::load(&working_dir)?;

    let store = ArtifactStore::new(working_dir.join(&config.root));
    // artifact keys don't depend on the target value
    let catalog = build_catalog("example.com", &config);

    utils::print_header("Staged artifacts");

    let mut present = 0;
    let mut total = 0;
    for stage in &catalog {
        let Some(output) = stage.output else { continue };
        total += 1;

        if store.exists(&output) {
            present += 1;
            let size = store.size(&output).unwrap_or(0);
            let age = store
                .age(&output)
                .map(format_age)
                .unwrap_or_else(|| "?".into());
            utils::print_success(&format!(
                "{}  ({}, {} old)",
                output.rel_path(),
                format_size(size),
                age
            ));
        } else {
            println!(
                "  {} {}",
                "○".dimmed(),
                format!("{} (missing)", output.rel_path()).dimmed()
            );
        }
    }

    println!();
    println!("{} of {} artifacts staged", present, total);

    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}
