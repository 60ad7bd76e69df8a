// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! test-capture entry point.

use std::fs::File;
use std::io;
use std::os::fd::AsFd;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use stdcap::{CaptureManager, CaptureRuntime};
use tracing_subscriber::EnvFilter;

use test_capture::{Cli, RunError, Runner, Shell, SummaryWriter};

const LOG_ENV: &str = "STDCAP_LOG";

/// Exit code for a run stopped by Ctrl+C
const INTERRUPTED: i32 = 130;

fn main() {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            eprintln!("test-capture: {error:#}");
            std::process::exit(3);
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<i32> {
    init_logging()?;

    let runtime = Arc::new(CaptureRuntime::new());
    let manager = CaptureManager::new(runtime, cli.capture.method());
    let shell = manager
        .on_process_start(|| Shell::probe(&cli.shell))
        .context("startup failed")?;

    let runner = Runner::new(manager.clone(), shell);
    register_interrupt(runner.interrupt_flag());

    let summary = match runner.run(&cli.commands) {
        Ok(summary) => summary,
        Err(RunError::Interrupted) => {
            manager.on_keyboard_interrupt();
            eprintln!("test-capture: interrupted");
            return Ok(INTERRUPTED);
        }
        Err(error) => {
            manager.on_internal_error();
            return Err(error).context("run failed");
        }
    };
    manager
        .stop_global_capturing()
        .context("failed to stop capturing")?;

    let mut writer = SummaryWriter::new(io::stdout().lock(), cli.show_capture);
    if cli.json {
        writer.write_json(&summary)?;
    } else {
        writer.write_text(&summary)?;
    }
    Ok(summary.exit_code())
}

/// Log to a duplicate of the original stderr, so log lines bypass capture.
fn init_logging() -> anyhow::Result<()> {
    let original_stderr = io::stderr()
        .as_fd()
        .try_clone_to_owned()
        .context("failed to duplicate stderr")?;
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(File::from(original_stderr)))
        .with_ansi(false)
        .init();
    Ok(())
}

#[cfg(unix)]
fn register_interrupt(flag: Arc<AtomicBool>) {
    // Ctrl+C still reaches the running child; the runner stops afterwards.
    if let Err(error) = signal_hook::flag::register(signal_hook::consts::SIGINT, flag) {
        tracing::warn!(%error, "failed to register SIGINT handler");
    }
}

#[cfg(not(unix))]
fn register_interrupt(_flag: Arc<AtomicBool>) {}
