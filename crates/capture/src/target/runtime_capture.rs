// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture by swapping the runtime handle for a slot.

use std::sync::Arc;

use tracing::debug;

use super::{CaptureTarget, TargetState};
use crate::error::CaptureError;
use crate::runtime::{CaptureRuntime, Handle, Sink};
use crate::slot::Slot;

/// Swaps the [`CaptureRuntime`] handle for one slot with a sink.
///
/// Never touches OS descriptors, so it cannot fail for resource reasons.
/// On the input slot the substitute refuses reads with
/// [`CaptureError::BlockedRead`].
#[derive(Debug)]
pub struct RuntimeCapture {
    slot: Slot,
    runtime: Arc<CaptureRuntime>,
    sink: Sink,
    tee: bool,
    original: Option<Handle>,
    state: TargetState,
}

impl RuntimeCapture {
    pub fn new(runtime: Arc<CaptureRuntime>, slot: Slot) -> Self {
        let sink = match slot {
            Slot::Input => Sink::Null,
            Slot::Output | Slot::Error => Sink::memory(),
        };
        Self::with_sink(runtime, slot, sink)
    }

    /// Capture that also passes every write through to the original handle
    pub fn tee(runtime: Arc<CaptureRuntime>, slot: Slot) -> Self {
        let mut capture = Self::new(runtime, slot);
        capture.tee = slot != Slot::Input;
        capture
    }

    /// Capture into a caller-provided sink
    pub fn with_sink(runtime: Arc<CaptureRuntime>, slot: Slot, sink: Sink) -> Self {
        Self {
            slot,
            runtime,
            sink,
            tee: false,
            original: None,
            state: TargetState::Initialized,
        }
    }

    fn substitute(&self) -> Handle {
        match (&self.sink, &self.original) {
            (Sink::Memory(buffer), Some(original)) if self.tee => Handle::Tee {
                buffer: buffer.clone(),
                passthrough: Box::new(original.clone()),
            },
            _ => Handle::Sink(self.sink.clone()),
        }
    }
}

impl CaptureTarget for RuntimeCapture {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn state(&self) -> TargetState {
        self.state
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("start", self.slot, &[TargetState::Initialized])?;
        self.original = Some(self.runtime.current(self.slot));
        self.runtime.set_current(self.slot, self.substitute());
        self.state = TargetState::Started;
        debug!(slot = %self.slot, tee = self.tee, "runtime capture started");
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.state.ensure("snapshot", self.slot, TargetState::ACTIVE)?;
        Ok(self.sink.take()?)
    }

    fn suspend(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("suspend", self.slot, TargetState::ACTIVE)?;
        if let Some(original) = &self.original {
            self.runtime.set_current(self.slot, original.clone());
        }
        self.state = TargetState::Suspended;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("resume", self.slot, TargetState::ACTIVE)?;
        self.runtime.set_current(self.slot, self.substitute());
        self.state = TargetState::Started;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("stop", self.slot, TargetState::STOPPABLE)?;
        if let Some(original) = self.original.take() {
            self.runtime.set_current(self.slot, original);
        }
        self.state = TargetState::Done;
        debug!(slot = %self.slot, "runtime capture stopped");
        Ok(())
    }

    fn write_original(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        self.state.ensure("write_original", self.slot, TargetState::ACTIVE)?;
        match &self.original {
            Some(original) => Ok(original.write(data)?),
            None => Ok(()),
        }
    }
}

impl Drop for RuntimeCapture {
    fn drop(&mut self) {
        if let Some(original) = self.original.take() {
            self.runtime.set_current(self.slot, original);
        }
    }
}

#[cfg(test)]
#[path = "runtime_capture_tests.rs"]
mod tests;
