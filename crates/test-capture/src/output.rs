// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text and JSON rendering of a run summary.

use std::io::{self, Write};

use stdcap::ReportSection;

use crate::runner::{ItemOutcome, RunSummary};

const RULE_WIDTH: usize = 60;

/// Writes a [`RunSummary`] for humans or machines
pub struct SummaryWriter<W: Write> {
    writer: W,
    show_capture: bool,
}

impl<W: Write> SummaryWriter<W> {
    /// `show_capture` prints captured sections for passing items as well.
    pub fn new(writer: W, show_capture: bool) -> Self {
        Self {
            writer,
            show_capture,
        }
    }

    pub fn write_json(&mut self, summary: &RunSummary) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, summary)?;
        writeln!(self.writer)
    }

    pub fn write_text(&mut self, summary: &RunSummary) -> io::Result<()> {
        if !summary.collection_errors.is_empty() {
            for error in &summary.collection_errors {
                writeln!(self.writer, "ERROR collecting {error}")?;
            }
            self.write_sections(&summary.collection)?;
            return writeln!(
                self.writer,
                "{} error(s) during collection",
                summary.collection_errors.len()
            );
        }

        for item in &summary.items {
            self.write_item(item)?;
        }
        writeln!(
            self.writer,
            "{} passed, {} failed",
            summary.passed(),
            summary.failed()
        )
    }

    fn write_item(&mut self, item: &ItemOutcome) -> io::Result<()> {
        let verdict = if item.passed { "PASSED" } else { "FAILED" };
        write!(self.writer, "{verdict} {} ({})", item.name, item.command)?;
        match (&item.error, item.exit_code) {
            (Some(error), _) => write!(self.writer, ": {error}")?,
            (None, Some(code)) if code != 0 => write!(self.writer, ": exit code {code}")?,
            (None, None) if !item.passed => write!(self.writer, ": terminated by signal")?,
            _ => {}
        }
        writeln!(self.writer)?;

        if !item.passed || self.show_capture {
            self.write_sections(&item.sections)?;
        }
        Ok(())
    }

    fn write_sections(&mut self, sections: &[ReportSection]) -> io::Result<()> {
        for section in sections {
            let title = format!(" {} ", section.title());
            writeln!(self.writer, "{title:-^width$}", width = RULE_WIDTH)?;
            self.writer.write_all(section.content.as_bytes())?;
            if !section.content.ends_with('\n') {
                writeln!(self.writer)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
