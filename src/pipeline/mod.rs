// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Pipeline definitions and orchestration
//!
//! The stage catalog (declarative data), the dependency DAG asserted over
//! it, and the runner that interprets it.

mod catalog;
mod dag;
mod runner;

pub use catalog::*;
pub use dag::StageDag;
pub use runner::{
    FailureKind, PipelineOutcome, PipelineRunner, RunOptions, RunSummary, StageFailure,
    StageReport, StageState,
};
