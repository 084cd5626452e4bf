// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Progress indicators
//!
//! Per-stage spinner shown while an external tool runs.

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner for one running pipeline stage
pub fn stage_spinner(index: usize, total: usize, name: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
            .template("  {spinner:.blue} {msg}")
            .expect("Invalid spinner template"),
    );
    pb.set_message(format!("[{:02}/{}] {}...", index, total, name));
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_carries_stage_message() {
        let pb = stage_spinner(3, 21, "naabu-top1k");
        assert!(pb.message().contains("[03/21]"));
        assert!(pb.message().contains("naabu-top1k"));
        pb.finish_and_clear();
    }
}
