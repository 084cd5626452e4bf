// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Run configuration
//!
//! Optional `.reconflow.toml` in the working directory. Everything has a
//! default, so the file is only needed to override staging location, the
//! ffuf wordlist, or per-stage timeouts.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{ReconflowError, ReconflowResult};

/// Run configuration loaded from `.reconflow.toml`
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Staging root; `output/` and `screenshots/` are created beneath it
    pub root: PathBuf,

    /// Wordlist used for directory fuzzing
    pub wordlist: PathBuf,

    /// Per-stage timeout overrides in seconds, keyed by stage name
    pub timeouts: HashMap<String, u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            wordlist: PathBuf::from("/usr/share/wordlists/dirb/common.txt"),
            timeouts: HashMap::new(),
        }
    }
}

impl RunConfig {
    /// Config file name looked up in the working directory
    pub const FILE_NAME: &'static str = ".reconflow.toml";

    /// Load config from `dir`, falling back to defaults when no file exists
    pub fn load(dir: &Path) -> ReconflowResult<Self> {
        let path = dir.join(Self::FILE_NAME);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path).map_err(|e| ReconflowError::ConfigRead {
            path: path.clone(),
            error: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| ReconflowError::ConfigParse {
            path,
            error: e.to_string(),
        })
    }

    /// Timeout override for a stage, if configured
    pub fn timeout_for(&self, stage_name: &str) -> Option<Duration> {
        self.timeouts.get(stage_name).map(|s| Duration::from_secs(*s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_no_file() {
        let dir = TempDir::new().unwrap();
        let config = RunConfig::load(dir.path()).unwrap();

        assert_eq!(config.root, PathBuf::from("."));
        assert!(config.timeouts.is_empty());
    }

    #[test]
    fn test_load_overrides() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(RunConfig::FILE_NAME),
            r#"
root = "scans"
wordlist = "/opt/lists/common.txt"

[timeouts]
nuclei-web = 10800
"#,
        )
        .unwrap();

        let config = RunConfig::load(dir.path()).unwrap();
        assert_eq!(config.root, PathBuf::from("scans"));
        assert_eq!(config.wordlist, PathBuf::from("/opt/lists/common.txt"));
        assert_eq!(
            config.timeout_for("nuclei-web"),
            Some(Duration::from_secs(10800))
        );
        assert_eq!(config.timeout_for("subfinder"), None);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(RunConfig::FILE_NAME), "bogus = true\n").unwrap();

        let result = RunConfig::load(dir.path());
        assert!(matches!(result, Err(ReconflowError::ConfigParse { .. })));
    }
}
