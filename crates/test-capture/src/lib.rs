// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run shell commands as test items with their output captured.
//!
//! Each command is one item. It goes through setup, call and teardown
//! phases under a [`stdcap::CaptureManager`]; what it prints is attached to
//! its report and shown only when it fails (or with `--show-capture`).

pub mod cli;
pub mod output;
pub mod runner;

pub use cli::Cli;
pub use output::SummaryWriter;
pub use runner::{ItemOutcome, RunError, RunSummary, Runner, Shell};
