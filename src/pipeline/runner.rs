// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Pipeline runner
//!
//! Walks the stage catalog in index order: skips stages whose artifact is
//! already staged (unless forced), fails stages whose required inputs are
//! absent without invoking anything, dispatches tool and merge recipes,
//! and decides per the stage's failure policy whether to continue or
//! abort. Staging I/O errors abort regardless of policy.

use colored::Colorize;
use serde::Serialize;
use std::collections::BTreeSet;
use std::time::Instant;

use crate::errors::{ReconflowError, ReconflowResult};
use crate::gateway::{InvocationRequest, ToolInvoker};
use crate::merge;
use crate::pipeline::{
    Arg, Invocation, MergeRecipe, OutputMode, StageDag, StageDescriptor, ToolInvocation,
};
use crate::preflight::PreflightReport;
use crate::store::ArtifactStore;
use crate::utils::progress;

/// Pipeline execution options
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Ignore existing artifacts and re-execute every stage
    pub force: bool,
    /// Echo failed stages' captured stderr
    pub verbose: bool,
}

/// Terminal state of one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageState {
    Skipped,
    Succeeded,
    Failed,
}

/// Why a stage failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    PreflightMissingTool,
    MissingInput,
    Timeout,
    ToolFailure,
    SpawnFailed,
    Io,
}

/// Recorded failure of one stage
#[derive(Debug, Clone, Serialize)]
pub struct StageFailure {
    pub kind: FailureKind,
    pub detail: String,
    /// Captured diagnostic text (stderr) where available
    pub diagnostic: Option<String>,
}

/// Terminal record of one stage for the run summary
#[derive(Debug, Clone, Serialize)]
pub struct StageReport {
    pub index: usize,
    pub name: String,
    pub state: StageState,
    pub duration_ms: u64,
    pub artifact: Option<String>,
    pub failure: Option<StageFailure>,
}

/// Terminal state of the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// Every stage reached a terminal state; skippable failures allowed
    Completed,
    /// A fatal stage failed, or staging I/O broke
    Aborted,
}

/// Result of a pipeline run
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub target: String,
    pub outcome: PipelineOutcome,
    pub aborted_stage: Option<String>,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub stages: Vec<StageReport>,
    /// Staged artifacts present after the run, relative to the root
    pub artifacts: Vec<String>,
}

/// Generic interpreter over the stage catalog
pub struct PipelineRunner<'a> {
    catalog: &'a [StageDescriptor],
    store: &'a ArtifactStore,
    gateway: &'a dyn ToolInvoker,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(
        catalog: &'a [StageDescriptor],
        store: &'a ArtifactStore,
        gateway: &'a dyn ToolInvoker,
    ) -> Self {
        Self {
            catalog,
            store,
            gateway,
        }
    }

    /// Execute the pipeline.
    ///
    /// Returns `Err` only for pre-run rejections (invalid catalog, a
    /// missing tool that a fatal stage needs, staging layout I/O); once
    /// stages start executing, failures are folded into the summary and
    /// the terminal outcome tells completion from abort.
    pub async fn run(
        &self,
        target: &str,
        preflight: &PreflightReport,
        options: &RunOptions,
    ) -> ReconflowResult<RunSummary> {
        let started = Instant::now();

        // assert the catalog ordering invariant once, before any work
        StageDag::build(self.catalog)?;

        // fail fast if a fatal-tier stage can never run; skippable stages
        // with missing tools fail individually later without spawning
        let mut unavailable: BTreeSet<&str> = BTreeSet::new();
        for stage in self.catalog {
            if let Some(bin) = stage.tool_bin() {
                if !preflight.is_present(bin) {
                    if stage.is_fatal() {
                        return Err(ReconflowError::preflight_missing(bin));
                    }
                    unavailable.insert(bin);
                }
            }
        }

        self.store.ensure_layout()?;

        let total = self.catalog.len();
        let mut reports: Vec<StageReport> = Vec::with_capacity(total);
        let mut aborted_stage: Option<String> = None;

        for stage in self.catalog {
            if let Some(output) = stage.output {
                if self.store.is_fresh(&output, options.force) {
                    println!(
                        "  {} [{:02}/{}] {} {}",
                        "○".dimmed(),
                        stage.index,
                        total,
                        stage.name,
                        "(fresh, skipped)".dimmed()
                    );
                    reports.push(StageReport {
                        index: stage.index,
                        name: stage.name.to_string(),
                        state: StageState::Skipped,
                        duration_ms: 0,
                        artifact: Some(output.rel_path().to_string()),
                        failure: None,
                    });
                    continue;
                }
            }

            let spinner = progress::stage_spinner(stage.index, total, stage.name);
            let stage_start = Instant::now();
            let result = self.execute_stage(stage, &unavailable).await;
            spinner.finish_and_clear();
            let duration = stage_start.elapsed();

            match result {
                Ok(()) => {
                    println!(
                        "  {} [{:02}/{}] {} ({:.1}s)",
                        "✓".green(),
                        stage.index,
                        total,
                        stage.name.bold(),
                        duration.as_secs_f64()
                    );
                    if let Some(output) = stage.output {
                        if self.store.size(&output) == Some(0) {
                            println!(
                                "    {} {} is empty",
                                "⚠".yellow(),
                                output.rel_path()
                            );
                        }
                    }
                    reports.push(StageReport {
                        index: stage.index,
                        name: stage.name.to_string(),
                        state: StageState::Succeeded,
                        duration_ms: duration.as_millis() as u64,
                        artifact: stage.output.map(|o| o.rel_path().to_string()),
                        failure: None,
                    });
                }
                Err(err) => {
                    let escalates = err.escalates();
                    let failure = classify(&err);

                    println!(
                        "  {} [{:02}/{}] {} {}",
                        "✗".red(),
                        stage.index,
                        total,
                        stage.name.bold(),
                        format!("failed: {}", failure.detail).dimmed()
                    );
                    if options.verbose {
                        if let Some(ref diagnostic) = failure.diagnostic {
                            eprintln!("{}", diagnostic.dimmed());
                        }
                    }

                    reports.push(StageReport {
                        index: stage.index,
                        name: stage.name.to_string(),
                        state: StageState::Failed,
                        duration_ms: duration.as_millis() as u64,
                        artifact: None,
                        failure: Some(failure),
                    });

                    if escalates || stage.is_fatal() {
                        aborted_stage = Some(stage.name.to_string());
                        break;
                    }
                }
            }
        }

        let outcome = if aborted_stage.is_some() {
            PipelineOutcome::Aborted
        } else {
            PipelineOutcome::Completed
        };

        let artifacts = self
            .catalog
            .iter()
            .filter_map(|stage| stage.output)
            .filter(|key| self.store.exists(key))
            .map(|key| key.rel_path().to_string())
            .collect();

        Ok(RunSummary {
            target: target.to_string(),
            outcome,
            aborted_stage,
            succeeded: count(&reports, StageState::Succeeded),
            skipped: count(&reports, StageState::Skipped),
            failed: count(&reports, StageState::Failed),
            duration_ms: started.elapsed().as_millis() as u64,
            stages: reports,
            artifacts,
        })
    }

    async fn execute_stage(
        &self,
        stage: &StageDescriptor,
        unavailable: &BTreeSet<&str>,
    ) -> ReconflowResult<()> {
        tracing::debug!(stage = stage.name, index = stage.index, "executing stage");

        if let Some(bin) = stage.tool_bin() {
            if unavailable.contains(bin) {
                return Err(ReconflowError::preflight_missing(bin));
            }
        }

        // all required inputs must be materialized before anything runs
        for input in &stage.inputs {
            if !input.optional && !self.store.exists(&input.key) {
                return Err(ReconflowError::MissingInput {
                    stage: stage.name.to_string(),
                    input: input.key.key().to_string(),
                });
            }
        }

        match &stage.invocation {
            Invocation::Merge(recipe) => self.execute_merge(stage, recipe),
            Invocation::Tool(tool) => self.execute_tool(stage, tool).await,
        }
    }

    fn execute_merge(&self, stage: &StageDescriptor, recipe: &MergeRecipe) -> ReconflowResult<()> {
        let mut lines = Vec::new();
        for input in &stage.inputs {
            // absent optional sources merge as empty
            if self.store.exists(&input.key) {
                lines.extend(self.store.read_lines(&input.key)?);
            }
        }

        let merged = merge::combine(lines, recipe);
        let output = expect_output(stage)?;
        self.store.write_lines(&output, &merged)
    }

    async fn execute_tool(
        &self,
        stage: &StageDescriptor,
        tool: &ToolInvocation,
    ) -> ReconflowResult<()> {
        let output = expect_output(stage)?;
        let staged = self.store.begin_write(&output)?;

        let args = tool
            .args
            .iter()
            .map(|arg| match arg {
                Arg::Lit(s) => s.clone(),
                Arg::Artifact(key) => self.store.path(key).display().to_string(),
                Arg::OutputPath => staged.tmp_path().display().to_string(),
            })
            .collect();

        let request = InvocationRequest {
            tool: tool.bin.to_string(),
            args,
            stdin: tool.stdin.as_ref().map(|key| self.store.path(key)),
            stdout_to: match tool.output_mode {
                OutputMode::Stdout => Some(staged.tmp_path().to_path_buf()),
                OutputMode::ToolManaged => None,
            },
            cwd: self.store.root().to_path_buf(),
            timeout: stage.timeout,
        };

        // Timeout and spawn failures propagate; the staged temp file is
        // dropped uncommitted, so no partial artifact becomes visible
        let outcome = self.gateway.invoke(&request).await?;

        if outcome.success() {
            // a tool-managed stage may legitimately have written nothing
            if !staged.tmp_path().exists() {
                std::fs::write(staged.tmp_path(), b"")
                    .map_err(|e| ReconflowError::io(staged.tmp_path(), e))?;
            }
            staged.commit()?;
            Ok(())
        } else {
            Err(ReconflowError::ToolFailure {
                tool: tool.bin.to_string(),
                exit_code: outcome.exit_code,
                stderr: outcome.stderr,
            })
        }
    }
}

fn expect_output(stage: &StageDescriptor) -> ReconflowResult<crate::pipeline::ArtifactKey> {
    stage.output.ok_or_else(|| ReconflowError::InvalidCatalog {
        reason: format!("stage '{}' has no output artifact", stage.name),
    })
}

fn count(reports: &[StageReport], state: StageState) -> usize {
    reports.iter().filter(|r| r.state == state).count()
}

fn classify(err: &ReconflowError) -> StageFailure {
    let (kind, diagnostic) = match err {
        ReconflowError::PreflightMissingTool { .. } => (FailureKind::PreflightMissingTool, None),
        ReconflowError::MissingInput { .. } => (FailureKind::MissingInput, None),
        ReconflowError::Timeout { .. } => (FailureKind::Timeout, None),
        ReconflowError::ToolFailure { stderr, .. } => {
            let diagnostic = (!stderr.trim().is_empty()).then(|| stderr.trim().to_string());
            (FailureKind::ToolFailure, diagnostic)
        }
        ReconflowError::SpawnFailed { .. } => (FailureKind::SpawnFailed, None),
        _ => (FailureKind::Io, None),
    };

    StageFailure {
        kind,
        detail: err.to_string(),
        diagnostic,
    }
}
