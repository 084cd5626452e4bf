// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Error types for the pipeline orchestrator
//!
//! Failures are classified so the runner can tell policy-scoped stage
//! failures (timeout, non-zero exit, missing input) apart from staging
//! failures that always abort the run.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for reconflow operations
pub type ReconflowResult<T> = Result<T, ReconflowError>;

/// Main error type for reconflow
#[derive(Error, Debug, Diagnostic)]
pub enum ReconflowError {
    // ─────────────────────────────────────────────────────────────────────────
    // Tool Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Required tool '{tool}' not found on PATH")]
    #[diagnostic(
        code(reconflow::preflight_missing_tool),
        help("{suggestion}")
    )]
    PreflightMissingTool {
        tool: String,
        suggestion: String,
    },

    #[error("Tool '{tool}' could not be spawned: {error}")]
    #[diagnostic(code(reconflow::spawn_failed))]
    SpawnFailed {
        tool: String,
        error: String,
        #[help]
        help: Option<String>,
    },

    #[error("Tool '{tool}' exited with status {exit_code}")]
    #[diagnostic(code(reconflow::tool_failure))]
    ToolFailure {
        tool: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Tool '{tool}' exceeded its {limit_secs}s time limit")]
    #[diagnostic(
        code(reconflow::timeout),
        help("The child process was terminated. Raise the stage timeout in .reconflow.toml if the tool needs longer.")
    )]
    Timeout { tool: String, limit_secs: u64 },

    // ─────────────────────────────────────────────────────────────────────────
    // Stage Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Stage '{stage}' is missing required input artifact '{input}'")]
    #[diagnostic(
        code(reconflow::missing_input),
        help("An earlier stage did not produce this artifact. Re-run without --force to execute only the missing stages.")
    )]
    MissingInput { stage: String, input: String },

    #[error("Artifact '{key}' not found at {path}")]
    #[diagnostic(code(reconflow::artifact_not_found))]
    ArtifactNotFound { key: String, path: PathBuf },

    // ─────────────────────────────────────────────────────────────────────────
    // Catalog Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Invalid stage catalog: {reason}")]
    #[diagnostic(
        code(reconflow::invalid_catalog),
        help("The stage table violates its ordering invariant; this is a bug in the catalog definition")
    )]
    InvalidCatalog { reason: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Config Errors
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to read config '{path}': {error}")]
    #[diagnostic(code(reconflow::config_read_error))]
    ConfigRead { path: PathBuf, error: String },

    #[error("Failed to parse config '{path}': {error}")]
    #[diagnostic(code(reconflow::config_parse_error))]
    ConfigParse { path: PathBuf, error: String },

    // ─────────────────────────────────────────────────────────────────────────
    // Staging I/O Errors — always abort the run regardless of stage policy
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Staging I/O error at '{path}': {error}")]
    #[diagnostic(
        code(reconflow::io_error),
        help("The staging area is unreliable (disk full? permissions?). Aborting rather than continuing with a corrupt artifact chain.")
    )]
    Io { path: PathBuf, error: String },
}

impl ReconflowError {
    /// Wrap an I/O error with the path it occurred at
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error: error.to_string(),
        }
    }

    /// Create a preflight error with an installation suggestion
    pub fn preflight_missing(tool: &str) -> Self {
        Self::PreflightMissingTool {
            tool: tool.to_string(),
            suggestion: install_hint(tool),
        }
    }

    /// True for errors that abort the pipeline regardless of the failing
    /// stage's declared policy.
    pub fn escalates(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::ArtifactNotFound { .. })
    }
}

/// Installation hint for a missing external tool
pub fn install_hint(tool: &str) -> String {
    let go_path = match tool {
        "subfinder" => Some("github.com/projectdiscovery/subfinder/v2/cmd/subfinder@latest"),
        "amass" => Some("github.com/owasp-amass/amass/v4/...@latest"),
        "dnsx" => Some("github.com/projectdiscovery/dnsx/cmd/dnsx@latest"),
        "naabu" => Some("github.com/projectdiscovery/naabu/v2/cmd/naabu@latest"),
        "httpx" => Some("github.com/projectdiscovery/httpx/cmd/httpx@latest"),
        "nuclei" => Some("github.com/projectdiscovery/nuclei/v3/cmd/nuclei@latest"),
        "gau" => Some("github.com/lc/gau/v2/cmd/gau@latest"),
        "unfurl" => Some("github.com/tomnomnom/unfurl@latest"),
        "gowitness" => Some("github.com/jaeles-project/gowitness@latest"),
        _ => None,
    };

    match go_path {
        Some(path) => format!("Install with: go install -v {}", path),
        None => format!("Install {} with your package manager and ensure it's on PATH", tool),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_hint_for_go_tool() {
        let hint = install_hint("subfinder");
        assert!(hint.contains("go install"));
        assert!(hint.contains("projectdiscovery/subfinder"));
    }

    #[test]
    fn test_install_hint_fallback() {
        let hint = install_hint("curl");
        assert!(hint.contains("package manager"));
    }

    #[test]
    fn test_io_errors_escalate() {
        let err = ReconflowError::io("/tmp/x", std::io::Error::other("disk full"));
        assert!(err.escalates());

        let err = ReconflowError::Timeout {
            tool: "naabu".into(),
            limit_secs: 10,
        };
        assert!(!err.escalates());
    }
}
