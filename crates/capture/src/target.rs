// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Strategies for redirecting a single standard stream.

mod descriptor;
mod runtime_capture;

use std::fmt;

use crate::error::CaptureError;
use crate::slot::Slot;

pub use descriptor::DescriptorCapture;
pub use runtime_capture::RuntimeCapture;

/// Lifecycle of a capture target.
///
/// `Initialized -> Started -> (Suspended <-> Started)* -> Done`; `Done` is
/// terminal and reached exactly once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetState {
    Initialized,
    Started,
    Suspended,
    Done,
}

impl TargetState {
    pub(crate) const ACTIVE: &'static [TargetState] =
        &[TargetState::Started, TargetState::Suspended];

    pub(crate) const STOPPABLE: &'static [TargetState] = &[
        TargetState::Initialized,
        TargetState::Started,
        TargetState::Suspended,
    ];

    pub(crate) fn ensure(
        self,
        op: &str,
        slot: Slot,
        allowed: &[TargetState],
    ) -> Result<(), CaptureError> {
        if allowed.contains(&self) {
            return Ok(());
        }
        if self == TargetState::Done && op == "stop" {
            return Err(CaptureError::usage(format!("{slot} capture was already stopped")));
        }
        let expected: Vec<&str> = allowed.iter().map(|s| s.name()).collect();
        Err(CaptureError::usage(format!(
            "cannot {op} {slot} capture in state {self}; expected {}",
            expected.join(" or ")
        )))
    }

    pub fn name(self) -> &'static str {
        match self {
            TargetState::Initialized => "initialized",
            TargetState::Started => "started",
            TargetState::Suspended => "suspended",
            TargetState::Done => "done",
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Redirect one stream, then un-redirect it.
pub trait CaptureTarget: fmt::Debug + Send {
    fn slot(&self) -> Slot;

    fn state(&self) -> TargetState;

    /// Save the current handle as the original and install the sink.
    fn start(&mut self) -> Result<(), CaptureError>;

    /// Everything written since the last snapshot (or start); clears the sink.
    fn snapshot(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Re-attach the original handle, keeping unread sink contents.
    fn suspend(&mut self) -> Result<(), CaptureError>;

    /// Re-attach the sink after [`suspend`](Self::suspend).
    fn resume(&mut self) -> Result<(), CaptureError>;

    /// Restore the original handle for good. Stopping twice is an error.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Write straight to the saved original, bypassing the sink.
    fn write_original(&mut self, data: &[u8]) -> Result<(), CaptureError>;
}

/// Target that leaves its stream alone. Only the stop-once rule applies.
#[derive(Debug)]
pub struct NoCapture {
    slot: Slot,
    state: TargetState,
}

impl NoCapture {
    pub fn new(slot: Slot) -> Self {
        Self {
            slot,
            state: TargetState::Initialized,
        }
    }
}

impl CaptureTarget for NoCapture {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn state(&self) -> TargetState {
        self.state
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.state = TargetState::Started;
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Vec<u8>, CaptureError> {
        Ok(Vec::new())
    }

    fn suspend(&mut self) -> Result<(), CaptureError> {
        self.state = TargetState::Suspended;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.state = TargetState::Started;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("stop", self.slot, TargetState::STOPPABLE)?;
        self.state = TargetState::Done;
        Ok(())
    }

    fn write_original(&mut self, _data: &[u8]) -> Result<(), CaptureError> {
        Ok(())
    }
}

#[cfg(test)]
#[path = "target_tests.rs"]
mod tests;
