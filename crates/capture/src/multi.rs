// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lock-step control of the input, output and error targets.

use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::CaptureMethod;
use crate::error::CaptureError;
use crate::result::{CaptureData, CaptureResult};
use crate::runtime::CaptureRuntime;
use crate::slot::Slot;
use crate::target::{CaptureTarget, DescriptorCapture, NoCapture, RuntimeCapture};

const STOP_ORDER: [Slot; 3] = [Slot::Input, Slot::Error, Slot::Output];

pub(crate) fn descriptor_target(
    runtime: &Arc<CaptureRuntime>,
    slot: Slot,
) -> Result<Option<Box<dyn CaptureTarget>>, CaptureError> {
    let target = DescriptorCapture::new(Arc::clone(runtime), slot)?;
    Ok(Some(Box::new(target)))
}

pub(crate) fn runtime_target(
    runtime: &Arc<CaptureRuntime>,
    slot: Slot,
) -> Option<Box<dyn CaptureTarget>> {
    Some(Box::new(RuntimeCapture::new(Arc::clone(runtime), slot)))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MultiState {
    Initialized,
    Started,
    Suspended,
    Stopped,
}

/// Up to three capture targets driven together.
///
/// An absent target means "leave this stream alone". `T` selects text
/// (`String`) or binary (`Vec<u8>`) results.
#[derive(Debug)]
pub struct MultiCapture<T> {
    input: Option<Box<dyn CaptureTarget>>,
    output: Option<Box<dyn CaptureTarget>>,
    error: Option<Box<dyn CaptureTarget>>,
    state: MultiState,
    input_suspended: bool,
    _data: PhantomData<fn() -> T>,
}

impl<T: CaptureData> MultiCapture<T> {
    pub fn new(
        input: Option<Box<dyn CaptureTarget>>,
        output: Option<Box<dyn CaptureTarget>>,
        error: Option<Box<dyn CaptureTarget>>,
    ) -> Self {
        Self {
            input,
            output,
            error,
            state: MultiState::Initialized,
            input_suspended: false,
            _data: PhantomData,
        }
    }

    /// The global capture layer for `method`
    pub fn for_method(
        method: CaptureMethod,
        runtime: &Arc<CaptureRuntime>,
    ) -> Result<Self, CaptureError> {
        let capture = match method {
            CaptureMethod::Fd => Self::new(
                descriptor_target(runtime, Slot::Input)?,
                descriptor_target(runtime, Slot::Output)?,
                descriptor_target(runtime, Slot::Error)?,
            ),
            CaptureMethod::Sys => Self::new(
                runtime_target(runtime, Slot::Input),
                runtime_target(runtime, Slot::Output),
                runtime_target(runtime, Slot::Error),
            ),
            CaptureMethod::No => Self::new(
                None,
                Some(Box::new(NoCapture::new(Slot::Output))),
                Some(Box::new(NoCapture::new(Slot::Error))),
            ),
            CaptureMethod::TeeSys => {
                let tee = |slot| -> Option<Box<dyn CaptureTarget>> {
                    Some(Box::new(RuntimeCapture::tee(Arc::clone(runtime), slot)))
                };
                Self::new(None, tee(Slot::Output), tee(Slot::Error))
            }
        };
        Ok(capture)
    }

    fn target_mut(&mut self, slot: Slot) -> Option<&mut Box<dyn CaptureTarget>> {
        match slot {
            Slot::Input => self.input.as_mut(),
            Slot::Output => self.output.as_mut(),
            Slot::Error => self.error.as_mut(),
        }
    }

    pub fn is_started(&self) -> bool {
        self.state == MultiState::Started
    }

    pub fn is_stopped(&self) -> bool {
        self.state == MultiState::Stopped
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != MultiState::Initialized {
            return Err(CaptureError::usage("capture was already started"));
        }
        for slot in Slot::START_ORDER {
            if let Some(target) = self.target_mut(slot) {
                target.start()?;
            }
        }
        self.state = MultiState::Started;
        Ok(())
    }

    /// Hand the streams back to their originals. Input stays captured
    /// unless `also_input` is set.
    pub fn suspend(&mut self, also_input: bool) -> Result<(), CaptureError> {
        self.ensure_live("suspend")?;
        for slot in [Slot::Output, Slot::Error] {
            if let Some(target) = self.target_mut(slot) {
                target.suspend()?;
            }
        }
        if also_input {
            if let Some(input) = self.input.as_mut() {
                input.suspend()?;
                self.input_suspended = true;
            }
        }
        self.state = MultiState::Suspended;
        Ok(())
    }

    pub fn resume(&mut self) -> Result<(), CaptureError> {
        self.ensure_live("resume")?;
        for slot in [Slot::Output, Slot::Error] {
            if let Some(target) = self.target_mut(slot) {
                target.resume()?;
            }
        }
        if self.input_suspended {
            if let Some(input) = self.input.as_mut() {
                input.resume()?;
            }
            self.input_suspended = false;
        }
        self.state = MultiState::Started;
        Ok(())
    }

    /// Stop every target, in reverse start order. All targets are attempted
    /// even if one fails; the first failure is returned.
    pub fn stop(&mut self) -> Result<(), CaptureError> {
        if self.state == MultiState::Stopped {
            return Err(CaptureError::usage("capture was already stopped"));
        }
        self.state = MultiState::Stopped;
        let mut first_error = None;
        for slot in STOP_ORDER {
            if let Some(target) = self.target_mut(slot) {
                if let Err(error) = target.stop() {
                    first_error.get_or_insert(error);
                }
            }
        }
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Snapshot (and clear) output and error. Absent targets read as empty.
    pub fn read(&mut self) -> Result<CaptureResult<T>, CaptureError> {
        let out = self.snapshot(Slot::Output)?;
        let err = self.snapshot(Slot::Error)?;
        Ok(CaptureResult::new(out, err))
    }

    /// [`read`](Self::read), then write the same text to the original
    /// streams so it is not lost when capturing is torn down.
    pub fn pop_and_flush_to_original(&mut self) -> Result<CaptureResult<T>, CaptureError> {
        let result = self.read()?;
        self.write_original(Slot::Output, result.out())?;
        self.write_original(Slot::Error, result.err())?;
        Ok(result)
    }

    fn snapshot(&mut self, slot: Slot) -> Result<T, CaptureError> {
        match self.target_mut(slot) {
            Some(target) => Ok(T::decode(slot, target.snapshot()?)),
            None => Ok(T::default()),
        }
    }

    fn write_original(&mut self, slot: Slot, data: &T) -> Result<(), CaptureError> {
        if data.is_empty() {
            return Ok(());
        }
        match self.target_mut(slot) {
            Some(target) => target.write_original(data.as_bytes()),
            None => Ok(()),
        }
    }

    fn ensure_live(&self, op: &str) -> Result<(), CaptureError> {
        match self.state {
            MultiState::Started | MultiState::Suspended => Ok(()),
            MultiState::Initialized => Err(CaptureError::usage(format!(
                "cannot {op} a capture that was never started"
            ))),
            MultiState::Stopped => Err(CaptureError::usage(format!(
                "cannot {op} a capture that was already stopped"
            ))),
        }
    }
}

#[cfg(test)]
#[path = "multi_tests.rs"]
mod tests;
