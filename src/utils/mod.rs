// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 reconflow contributors

//! Utility modules
//!
//! Common utilities for the reconflow CLI.

pub mod colors;
pub mod progress;

pub use colors::*;
