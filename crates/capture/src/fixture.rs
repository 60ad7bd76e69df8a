// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-test capture fixtures.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::debug;

use crate::error::CaptureError;
use crate::manager::{CaptureDisabledGuard, CaptureManager, ManagerState};
use crate::multi::{descriptor_target, runtime_target, MultiCapture};
use crate::result::{CaptureData, CaptureResult};
use crate::runtime::CaptureRuntime;
use crate::slot::Slot;

/// The four fixture variants a test can request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FixtureKind {
    /// Runtime-level, text
    Sys,
    /// Runtime-level, bytes
    SysBinary,
    /// Descriptor-level, text
    Fd,
    /// Descriptor-level, bytes
    FdBinary,
}

impl FixtureKind {
    pub const ALL: [FixtureKind; 4] = [
        FixtureKind::Sys,
        FixtureKind::SysBinary,
        FixtureKind::Fd,
        FixtureKind::FdBinary,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FixtureKind::Sys => "capsys",
            FixtureKind::SysBinary => "capsysbinary",
            FixtureKind::Fd => "capfd",
            FixtureKind::FdBinary => "capfdbinary",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn is_binary(self) -> bool {
        matches!(self, FixtureKind::SysBinary | FixtureKind::FdBinary)
    }

    pub fn is_descriptor(self) -> bool {
        matches!(self, FixtureKind::Fd | FixtureKind::FdBinary)
    }

    /// Fail if the test requested any capture fixture besides this one.
    pub fn ensure_exclusive(self, requested: &[FixtureKind]) -> Result<(), CaptureError> {
        let mut others: Vec<&str> = requested
            .iter()
            .filter(|kind| **kind != self)
            .map(|kind| kind.name())
            .collect();
        if others.is_empty() {
            return Ok(());
        }
        others.sort_unstable();
        others.dedup();
        Err(conflict(self, &others))
    }
}

impl fmt::Display for FixtureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub(crate) fn conflict(kind: FixtureKind, others: &[&str]) -> CaptureError {
    CaptureError::usage(format!(
        "cannot use {} and {} at the same time",
        others.join(", "),
        kind
    ))
}

/// Fixture operations the manager needs without knowing the data type
pub(crate) trait FixtureControl: Send + Sync {
    fn kind(&self) -> FixtureKind;
    fn start(&self) -> Result<(), CaptureError>;
    fn close(&self) -> Result<(), CaptureError>;
    fn suspend(&self) -> Result<(), CaptureError>;
    fn resume(&self) -> Result<(), CaptureError>;
    fn is_started(&self) -> bool;
}

struct FixtureState<T> {
    capture: Option<MultiCapture<T>>,
    captured_out: T,
    captured_err: T,
}

/// Output captured for one test.
///
/// Obtained from [`CaptureManager::capsys`] and friends. Cloning yields
/// another handle on the same capture.
pub struct CaptureFixture<T> {
    kind: FixtureKind,
    runtime: Arc<CaptureRuntime>,
    state: Arc<Mutex<FixtureState<T>>>,
    manager: Weak<Mutex<ManagerState>>,
}

impl<T: CaptureData> CaptureFixture<T> {
    pub(crate) fn new(
        kind: FixtureKind,
        runtime: Arc<CaptureRuntime>,
        manager: Weak<Mutex<ManagerState>>,
    ) -> Self {
        Self {
            kind,
            runtime,
            state: Arc::new(Mutex::new(FixtureState {
                capture: None,
                captured_out: T::default(),
                captured_err: T::default(),
            })),
            manager,
        }
    }

    pub fn kind(&self) -> FixtureKind {
        self.kind
    }

    /// Everything captured since the last call, including output kept from
    /// earlier phases of the same test.
    pub fn readouterr(&self) -> Result<CaptureResult<T>, CaptureError> {
        let mut state = self.state.lock();
        let current = match state.capture.as_mut() {
            Some(capture) => Some(capture.read()?),
            None => None,
        };
        let mut out = std::mem::take(&mut state.captured_out);
        let mut err = std::mem::take(&mut state.captured_err);
        if let Some(current) = current {
            let (current_out, current_err) = current.into_parts();
            out.append(current_out);
            err.append(current_err);
        }
        Ok(CaptureResult::new(out, err))
    }

    /// Suspend fixture and global capturing until the guard is dropped.
    pub fn disabled(&self) -> Result<CaptureDisabledGuard, CaptureError> {
        let inner = self
            .manager
            .upgrade()
            .ok_or_else(|| CaptureError::usage("capture manager is no longer running"))?;
        CaptureManager::from_shared(inner).global_and_fixture_disabled()
    }

    /// Run `action` with capturing disabled.
    pub fn with_disabled<R>(&self, action: impl FnOnce() -> R) -> Result<R, CaptureError> {
        let guard = self.disabled()?;
        let value = action();
        guard.release()?;
        Ok(value)
    }

    fn build_capture(&self) -> Result<MultiCapture<T>, CaptureError> {
        let runtime = &self.runtime;
        let capture = if self.kind.is_descriptor() {
            MultiCapture::new(
                None,
                descriptor_target(runtime, Slot::Output)?,
                descriptor_target(runtime, Slot::Error)?,
            )
        } else {
            MultiCapture::new(
                None,
                runtime_target(runtime, Slot::Output),
                runtime_target(runtime, Slot::Error),
            )
        };
        Ok(capture)
    }
}

impl<T: CaptureData> FixtureControl for CaptureFixture<T> {
    fn kind(&self) -> FixtureKind {
        self.kind
    }

    fn start(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        if state.capture.is_none() {
            let mut capture = self.build_capture()?;
            capture.start()?;
            state.capture = Some(capture);
            debug!(fixture = %self.kind, "fixture capture started");
        }
        Ok(())
    }

    /// Stop capturing, keeping unread output for the next `readouterr`
    /// and passing it through to whatever was installed underneath.
    fn close(&self) -> Result<(), CaptureError> {
        let mut state = self.state.lock();
        let Some(mut capture) = state.capture.take() else {
            return Ok(());
        };
        let flushed = capture.pop_and_flush_to_original();
        let stopped = capture.stop();
        let (out, err) = flushed?.into_parts();
        state.captured_out.append(out);
        state.captured_err.append(err);
        debug!(fixture = %self.kind, "fixture capture closed");
        stopped
    }

    fn suspend(&self) -> Result<(), CaptureError> {
        match self.state.lock().capture.as_mut() {
            Some(capture) => capture.suspend(false),
            None => Ok(()),
        }
    }

    fn resume(&self) -> Result<(), CaptureError> {
        match self.state.lock().capture.as_mut() {
            Some(capture) => capture.resume(),
            None => Ok(()),
        }
    }

    fn is_started(&self) -> bool {
        self.state
            .lock()
            .capture
            .as_ref()
            .is_some_and(MultiCapture::is_started)
    }
}

impl<T> Clone for CaptureFixture<T> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            runtime: Arc::clone(&self.runtime),
            state: Arc::clone(&self.state),
            manager: Weak::clone(&self.manager),
        }
    }
}

impl<T> fmt::Debug for CaptureFixture<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureFixture")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[path = "fixture_tests.rs"]
mod tests;
