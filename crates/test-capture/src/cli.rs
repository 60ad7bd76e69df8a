// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Command-line interface.

use clap::Parser;
use stdcap::CaptureArgs;

/// Run shell commands as test items, capturing what they print
#[derive(Parser, Clone, Debug)]
#[command(name = "test-capture", version)]
#[command(about = "Run shell commands as test items with captured output")]
pub struct Cli {
    #[command(flatten)]
    pub capture: CaptureArgs,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,

    /// Show captured output for passing items too
    #[arg(long)]
    pub show_capture: bool,

    /// Shell used to run each command
    #[arg(long, env = "STDCAP_SHELL", default_value = "sh")]
    pub shell: String,

    /// Commands to run, one test item each
    #[arg(last = true, required = true, value_name = "CMD")]
    pub commands: Vec<String>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
