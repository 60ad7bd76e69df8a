// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Standard stream capture for test harnesses.
//!
//! This crate redirects the process's standard streams (stdin, stdout,
//! stderr) so that a test runner can record what code under test prints,
//! and replay it to the real console when a test fails.
//!
//! The pieces, leaves first:
//!
//! - [`CaptureTarget`] strategies redirect one stream: [`NoCapture`],
//!   [`RuntimeCapture`] (swaps the handle in a [`CaptureRuntime`]) and
//!   [`DescriptorCapture`] (duplicates the OS file descriptor).
//! - [`MultiCapture`] drives up to three targets in lock-step.
//! - [`CaptureManager`] owns the global capture layer and the optional
//!   per-test fixture layer, and exposes the lifecycle brackets a runner calls.
//! - [`CaptureFixture`] is what a test body uses to read its own output.

mod config;
mod error;
mod fixture;
mod manager;
mod multi;
mod platform;
mod report;
mod result;
mod runtime;
mod slot;
mod target;

pub use config::{CaptureArgs, CaptureMethod};
pub use error::CaptureError;
pub use fixture::{CaptureFixture, FixtureKind};
pub use manager::{CaptureDisabledGuard, CaptureManager};
pub use multi::MultiCapture;
pub use platform::{console_needs_reopen, prepare_console_streams, reopen_standard_streams};
pub use report::{Phase, Report, ReportSection, ReportSink, StreamKey};
pub use result::{CaptureData, CaptureResult};
pub use runtime::{CaptureRuntime, Handle, RuntimeStream, SharedBuffer, Sink};
pub use slot::Slot;
pub use target::{CaptureTarget, DescriptorCapture, NoCapture, RuntimeCapture, TargetState};
