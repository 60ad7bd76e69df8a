// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runs each command as a test item under the capture manager.

use std::io;
use std::path::Path;
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use stdcap::{CaptureError, CaptureManager, CaptureMethod, Phase, Report, ReportSection};
use thiserror::Error;
use tracing::debug;

/// Pseudo-path the command list is "collected" from
const COMMAND_LINE: &str = "<command line>";

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("shell {program:?} could not be started: {source}")]
    ShellMissing {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("shell {program:?} failed a trial run ({status})")]
    ShellBroken { program: String, status: ExitStatus },

    #[error("interrupted")]
    Interrupted,
}

/// The shell commands are run through
#[derive(Clone, Debug)]
pub struct Shell {
    program: String,
}

impl Shell {
    /// Check that `program -c :` runs before any item depends on it.
    pub fn probe(program: &str) -> Result<Self, RunError> {
        let shell = Self {
            program: program.to_string(),
        };
        let status = shell.run(":").map_err(|source| RunError::ShellMissing {
            program: shell.program.clone(),
            source,
        })?;
        if !status.success() {
            return Err(RunError::ShellBroken {
                program: shell.program,
                status,
            });
        }
        debug!(program, "shell is usable");
        Ok(shell)
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run `command` with inherited stdio
    pub fn run(&self, command: &str) -> io::Result<ExitStatus> {
        Command::new(&self.program).arg("-c").arg(command).status()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Item {
    name: String,
    command: String,
}

fn collect(commands: &[String]) -> Result<Vec<Item>, Vec<String>> {
    let mut items = Vec::with_capacity(commands.len());
    let mut errors = Vec::new();
    for (index, command) in commands.iter().enumerate() {
        let name = format!("cmd{}", index + 1);
        if command.trim().is_empty() {
            errors.push(format!("{name}: empty command"));
            continue;
        }
        items.push(Item {
            name,
            command: command.clone(),
        });
    }
    if errors.is_empty() {
        debug!(count = items.len(), "collected items");
        Ok(items)
    } else {
        Err(errors)
    }
}

/// Result of one item across its three phases
#[derive(Clone, Debug, Serialize)]
pub struct ItemOutcome {
    pub name: String,
    pub command: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub sections: Vec<ReportSection>,
}

/// Everything a run produced
#[derive(Clone, Debug, Default, Serialize)]
pub struct RunSummary {
    pub method: CaptureMethod,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collection_errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub collection: Vec<ReportSection>,
    pub items: Vec<ItemOutcome>,
}

impl RunSummary {
    pub fn passed(&self) -> usize {
        self.items.iter().filter(|item| item.passed).count()
    }

    pub fn failed(&self) -> usize {
        self.items.len() - self.passed()
    }

    /// 0 when everything passed, 1 on failures, 2 on collection errors
    pub fn exit_code(&self) -> i32 {
        if !self.collection_errors.is_empty() {
            2
        } else if self.failed() > 0 {
            1
        } else {
            0
        }
    }
}

/// Drives collection and the setup/call/teardown phases of every item.
pub struct Runner {
    manager: CaptureManager,
    shell: Shell,
    interrupted: Arc<AtomicBool>,
}

impl Runner {
    pub fn new(manager: CaptureManager, shell: Shell) -> Self {
        Self {
            manager,
            shell,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Set from a signal handler to stop after the current phase.
    pub fn interrupt_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.interrupted)
    }

    pub fn run(&self, commands: &[String]) -> Result<RunSummary, RunError> {
        let mut summary = RunSummary {
            method: self.manager.method(),
            ..RunSummary::default()
        };

        let mut collection = Report::new();
        let collected = self.manager.around_collection(
            Path::new(COMMAND_LINE),
            &mut collection,
            || collect(commands),
        )?;
        summary.collection = collection.sections().to_vec();
        let items = match collected {
            Ok(items) => items,
            Err(errors) => {
                summary.collection_errors = errors;
                return Ok(summary);
            }
        };

        for item in &items {
            self.check_interrupted()?;
            summary.items.push(self.run_item(item)?);
        }
        Ok(summary)
    }

    fn run_item(&self, item: &Item) -> Result<ItemOutcome, RunError> {
        let manager = &self.manager;
        let mut report = Report::new();

        manager.item_capture(Phase::Setup, &item.name, &mut report, || {
            debug!(item = %item.name, command = %item.command, "setting up");
        })?;
        let status = manager.item_capture(Phase::Call, &item.name, &mut report, || {
            self.shell.run(&item.command)
        })?;
        self.check_interrupted()?;
        manager.item_capture(Phase::Teardown, &item.name, &mut report, || {
            debug!(item = %item.name, "tearing down");
        })?;

        let (passed, exit_code, error) = match status {
            Ok(status) => (status.success(), status.code(), None),
            Err(error) => (false, None, Some(error.to_string())),
        };
        debug!(item = %item.name, passed, ?exit_code, "item finished");
        Ok(ItemOutcome {
            name: item.name.clone(),
            command: item.command.clone(),
            passed,
            exit_code,
            error,
            sections: report.sections().to_vec(),
        })
    }

    fn check_interrupted(&self) -> Result<(), RunError> {
        if self.interrupted.load(Ordering::SeqCst) {
            return Err(RunError::Interrupted);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
