// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Report sections for captured output.

use std::fmt;

use serde::Serialize;

/// When output was captured
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Collect,
    Setup,
    Call,
    Teardown,
}

impl Phase {
    /// The phases every test item runs through, in order
    pub const ITEM_PHASES: [Phase; 3] = [Phase::Setup, Phase::Call, Phase::Teardown];

    pub fn name(self) -> &'static str {
        match self {
            Phase::Collect => "collect",
            Phase::Setup => "setup",
            Phase::Call => "call",
            Phase::Teardown => "teardown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which captured stream a section holds
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKey {
    Stdout,
    Stderr,
}

impl StreamKey {
    pub fn name(self) -> &'static str {
        match self {
            StreamKey::Stdout => "stdout",
            StreamKey::Stderr => "stderr",
        }
    }
}

impl fmt::Display for StreamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Receives captured text from the capture manager
pub trait ReportSink {
    fn add_report_section(&mut self, phase: Phase, key: StreamKey, content: &str);
}

/// One block of captured text
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReportSection {
    pub phase: Phase,
    pub key: StreamKey,
    pub content: String,
}

impl ReportSection {
    /// Heading shown above the section, e.g. "Captured stdout call"
    pub fn title(&self) -> String {
        match self.phase {
            Phase::Collect => format!("Captured {}", self.key),
            phase => format!("Captured {} {}", self.key, phase),
        }
    }
}

/// Collects report sections in arrival order
#[derive(Clone, Debug, Default, Serialize)]
pub struct Report {
    sections: Vec<ReportSection>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    /// Sections captured during `phase`
    pub fn for_phase(&self, phase: Phase) -> impl Iterator<Item = &ReportSection> {
        self.sections.iter().filter(move |s| s.phase == phase)
    }

    /// Text captured for `key` during `phase`, concatenated
    pub fn text(&self, phase: Phase, key: StreamKey) -> String {
        self.for_phase(phase)
            .filter(|s| s.key == key)
            .map(|s| s.content.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl ReportSink for Report {
    fn add_report_section(&mut self, phase: Phase, key: StreamKey, content: &str) {
        if content.is_empty() {
            return;
        }
        self.sections.push(ReportSection {
            phase,
            key,
            content: content.to_string(),
        });
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
