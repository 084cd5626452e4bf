// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Preflight tool checks
//!
//! Read-only probe of the execution environment: resolves each required
//! executable on PATH and reports found/missing per tool. Installation
//! is someone else's job; the pipeline only consumes the precondition.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Result of probing the environment for required executables
#[derive(Debug, Clone, Default)]
pub struct PreflightReport {
    tools: BTreeMap<String, Option<PathBuf>>,
}

impl PreflightReport {
    /// Build a report from known results; used by tests and callers that
    /// already probed elsewhere.
    pub fn from_results(tools: BTreeMap<String, Option<PathBuf>>) -> Self {
        Self { tools }
    }

    pub fn is_present(&self, tool: &str) -> bool {
        matches!(self.tools.get(tool), Some(Some(_)))
    }

    pub fn all_present(&self) -> bool {
        self.tools.values().all(Option::is_some)
    }

    /// Tools that could not be resolved, in sorted order
    pub fn missing(&self) -> Vec<&str> {
        self.tools
            .iter()
            .filter(|(_, path)| path.is_none())
            .map(|(tool, _)| tool.as_str())
            .collect()
    }

    /// Iterate over (tool, resolved path) pairs in sorted order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Path>)> {
        self.tools
            .iter()
            .map(|(tool, path)| (tool.as_str(), path.as_deref()))
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Resolve each named executable on PATH
pub fn check<I, S>(tools: I) -> PreflightReport
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let tools = tools
        .into_iter()
        .map(|tool| {
            let name = tool.as_ref().to_string();
            let path = which::which(&name).ok();
            (name, path)
        })
        .collect();

    PreflightReport { tools }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_classifies_found_and_missing() {
        let report = PreflightReport::from_results(BTreeMap::from([
            ("subfinder".to_string(), Some(PathBuf::from("/usr/bin/subfinder"))),
            ("amass".to_string(), None),
        ]));

        assert!(report.is_present("subfinder"));
        assert!(!report.is_present("amass"));
        assert!(!report.is_present("never-probed"));
        assert!(!report.all_present());
        assert_eq!(report.missing(), vec!["amass"]);
    }

    #[test]
    fn test_check_resolves_a_real_binary() {
        // `sh` exists on any unix test environment
        let report = check(["sh"]);
        assert!(report.is_present("sh"));
        assert!(report.all_present());
    }

    #[test]
    fn test_check_reports_nonsense_binary_missing() {
        let report = check(["reconflow-definitely-not-installed"]);
        assert_eq!(report.missing().len(), 1);
    }
}
