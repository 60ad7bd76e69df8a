// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide capture orchestration.
//!
//! The manager owns the global capture layer and at most one active
//! fixture. Per-phase bracketing follows a fixed order: resume global,
//! activate fixture, run, deactivate fixture, suspend global. The fixture
//! layer sits on top, so while it is active the global layer sees nothing.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, debug_span, warn};

use crate::config::CaptureMethod;
use crate::error::CaptureError;
use crate::fixture::{conflict, CaptureFixture, FixtureControl, FixtureKind};
use crate::multi::MultiCapture;
use crate::platform::prepare_console_streams;
use crate::report::{Phase, ReportSink, StreamKey};
use crate::result::{CaptureData, CaptureResult};
use crate::runtime::CaptureRuntime;
use crate::slot::Slot;

pub(crate) struct ManagerState {
    runtime: Arc<CaptureRuntime>,
    method: CaptureMethod,
    global: Option<MultiCapture<String>>,
    fixture: Option<Arc<dyn FixtureControl>>,
    console_prepared: bool,
}

impl ManagerState {
    /// Tear everything down without failing. Fixture first, since its
    /// saved descriptors point into the global layer.
    fn force_stop(&mut self, reason: &str) {
        if let Some(fixture) = self.fixture.take() {
            if let Err(error) = fixture.close() {
                warn!(
                    reason,
                    %error,
                    fixture = %fixture.kind(),
                    "ignoring fixture error during forced stop"
                );
            }
        }
        if let Some(mut global) = self.global.take() {
            if let Err(error) = global.pop_and_flush_to_original() {
                warn!(reason, %error, "could not flush captured output during forced stop");
            }
            if !global.is_stopped() {
                if let Err(error) = global.stop() {
                    warn!(reason, %error, "ignoring global capture error during forced stop");
                }
            }
            debug!(reason, "global capture force-stopped");
        }
    }
}

impl Drop for ManagerState {
    fn drop(&mut self) {
        self.force_stop("manager dropped");
    }
}

/// Owns global capturing and the active fixture for one test session.
///
/// Cloning yields another handle on the same session.
#[derive(Clone)]
pub struct CaptureManager {
    inner: Arc<Mutex<ManagerState>>,
}

impl CaptureManager {
    pub fn new(runtime: Arc<CaptureRuntime>, method: CaptureMethod) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManagerState {
                runtime,
                method,
                global: None,
                fixture: None,
                console_prepared: false,
            })),
        }
    }

    pub(crate) fn from_shared(inner: Arc<Mutex<ManagerState>>) -> Self {
        Self { inner }
    }

    pub fn method(&self) -> CaptureMethod {
        self.inner.lock().method
    }

    pub fn runtime(&self) -> Arc<CaptureRuntime> {
        Arc::clone(&self.inner.lock().runtime)
    }

    pub fn is_globally_capturing(&self) -> bool {
        self.method() != CaptureMethod::No
    }

    /// `"global"`, `"fixture <name>"`, or `None` when nothing captures.
    pub fn is_capturing(&self) -> Option<String> {
        let state = self.inner.lock();
        if state.method != CaptureMethod::No {
            return Some("global".to_string());
        }
        state
            .fixture
            .as_ref()
            .map(|fixture| format!("fixture {}", fixture.kind()))
    }

    // Global capturing

    pub fn start_global_capturing(&self) -> Result<(), CaptureError> {
        let mut state = self.inner.lock();
        if state.global.is_some() {
            return Err(CaptureError::usage("global capture was already started"));
        }
        if state.method == CaptureMethod::Fd && !state.console_prepared {
            prepare_console_streams(&state.runtime)?;
            state.console_prepared = true;
        }
        let mut global = MultiCapture::for_method(state.method, &state.runtime)?;
        global.start()?;
        state.global = Some(global);
        debug!(method = %state.method, "global capture started");
        Ok(())
    }

    /// Stop global capturing, passing anything still captured through to
    /// the original streams. A no-op when not started.
    pub fn stop_global_capturing(&self) -> Result<(), CaptureError> {
        let Some(mut global) = self.inner.lock().global.take() else {
            return Ok(());
        };
        let flushed = global.pop_and_flush_to_original();
        let stopped = global.stop();
        flushed?;
        stopped?;
        debug!("global capture stopped");
        Ok(())
    }

    pub fn resume_global_capture(&self) -> Result<(), CaptureError> {
        match self.inner.lock().global.as_mut() {
            Some(global) => global.resume(),
            None => Ok(()),
        }
    }

    pub fn suspend_global_capture(&self, also_input: bool) -> Result<(), CaptureError> {
        match self.inner.lock().global.as_mut() {
            Some(global) => global.suspend(also_input),
            None => Ok(()),
        }
    }

    pub fn read_global_capture(&self) -> Result<CaptureResult<String>, CaptureError> {
        match self.inner.lock().global.as_mut() {
            Some(global) => global.read(),
            None => Err(CaptureError::usage("global capture is not running")),
        }
    }

    // Fixtures

    /// Runtime-level text capture for one test. `requested` lists every
    /// capture fixture the test asked for.
    pub fn capsys(
        &self,
        requested: &[FixtureKind],
    ) -> Result<CaptureFixture<String>, CaptureError> {
        self.install_fixture(FixtureKind::Sys, requested)
    }

    pub fn capsysbinary(
        &self,
        requested: &[FixtureKind],
    ) -> Result<CaptureFixture<Vec<u8>>, CaptureError> {
        self.install_fixture(FixtureKind::SysBinary, requested)
    }

    pub fn capfd(
        &self,
        requested: &[FixtureKind],
    ) -> Result<CaptureFixture<String>, CaptureError> {
        self.install_fixture(FixtureKind::Fd, requested)
    }

    pub fn capfdbinary(
        &self,
        requested: &[FixtureKind],
    ) -> Result<CaptureFixture<Vec<u8>>, CaptureError> {
        self.install_fixture(FixtureKind::FdBinary, requested)
    }

    fn install_fixture<T: CaptureData>(
        &self,
        kind: FixtureKind,
        requested: &[FixtureKind],
    ) -> Result<CaptureFixture<T>, CaptureError> {
        kind.ensure_exclusive(requested)?;
        let fixture = {
            let mut state = self.inner.lock();
            if let Some(active) = &state.fixture {
                return Err(conflict(kind, &[active.kind().name()]));
            }
            let fixture = CaptureFixture::new(
                kind,
                Arc::clone(&state.runtime),
                Arc::downgrade(&self.inner),
            );
            state.fixture = Some(Arc::new(fixture.clone()));
            fixture
        };
        if let Err(error) = FixtureControl::start(&fixture) {
            self.inner.lock().fixture = None;
            return Err(error);
        }
        Ok(fixture)
    }

    /// Close the active fixture and forget it.
    pub fn teardown_fixture(&self) -> Result<(), CaptureError> {
        let fixture = self.inner.lock().fixture.take();
        match fixture {
            Some(fixture) => fixture.close(),
            None => Ok(()),
        }
    }

    fn current_fixture(&self) -> Option<Arc<dyn FixtureControl>> {
        self.inner.lock().fixture.clone()
    }

    pub fn activate_fixture(&self) -> Result<(), CaptureError> {
        match self.current_fixture() {
            Some(fixture) => fixture.start(),
            None => Ok(()),
        }
    }

    pub fn deactivate_fixture(&self) -> Result<(), CaptureError> {
        match self.current_fixture() {
            Some(fixture) => fixture.close(),
            None => Ok(()),
        }
    }

    pub fn suspend_fixture(&self) -> Result<(), CaptureError> {
        match self.current_fixture() {
            Some(fixture) => fixture.suspend(),
            None => Ok(()),
        }
    }

    pub fn resume_fixture(&self) -> Result<(), CaptureError> {
        match self.current_fixture() {
            Some(fixture) => fixture.resume(),
            None => Ok(()),
        }
    }

    // Scoped helpers

    /// Suspend the fixture, then global capturing, until the guard goes
    /// away. Only layers that were actually capturing are touched.
    pub fn global_and_fixture_disabled(&self) -> Result<CaptureDisabledGuard, CaptureError> {
        let mut guard = CaptureDisabledGuard {
            manager: self.clone(),
            fixture: None,
            global: false,
        };
        if let Some(fixture) = self.current_fixture().filter(|fixture| fixture.is_started()) {
            fixture.suspend()?;
            guard.fixture = Some(fixture);
        }
        if let Some(global) = self
            .inner
            .lock()
            .global
            .as_mut()
            .filter(|global| global.is_started())
        {
            global.suspend(false)?;
            guard.global = true;
        }
        Ok(guard)
    }

    /// Run one phase of a test item with capturing active and attach what
    /// the global layer caught to `report`. The item's fixture is released
    /// once its teardown phase ends.
    pub fn item_capture<R>(
        &self,
        phase: Phase,
        item: &str,
        report: &mut dyn ReportSink,
        body: impl FnOnce() -> R,
    ) -> Result<R, CaptureError> {
        let _span = debug_span!("item_capture", item, %phase).entered();
        self.resume_global_capture()?;
        let fixture_exit = if phase == Phase::Teardown {
            FixtureExit::Release
        } else {
            FixtureExit::Deactivate
        };
        let bracket = PhaseBracket::new(self, fixture_exit);
        self.activate_fixture()?;
        let value = body();
        bracket.exit()?;
        self.attach_global_output(phase, report)?;
        Ok(value)
    }

    /// Run collection of `path` with global capturing active.
    pub fn around_collection<R>(
        &self,
        path: &Path,
        report: &mut dyn ReportSink,
        body: impl FnOnce() -> R,
    ) -> Result<R, CaptureError> {
        let _span = debug_span!("collect", path = %path.display()).entered();
        self.resume_global_capture()?;
        let bracket = PhaseBracket::new(self, FixtureExit::Untouched);
        let value = body();
        bracket.exit()?;
        self.attach_global_output(Phase::Collect, report)?;
        Ok(value)
    }

    /// Start global capturing and run the host's early loading step under
    /// it. If loading fails, whatever it printed is shown on the real
    /// console before the error propagates.
    pub fn on_process_start<T, E>(&self, load: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<CaptureError>,
    {
        self.start_global_capturing()?;
        let bracket = PhaseBracket::new(self, FixtureExit::Untouched);
        let outcome = load();
        bracket.exit()?;
        if outcome.is_err() {
            let captured = self.read_global_capture()?;
            let runtime = self.runtime();
            runtime
                .write(Slot::Output, captured.out().as_bytes())
                .map_err(CaptureError::from)?;
            runtime
                .write(Slot::Error, captured.err().as_bytes())
                .map_err(CaptureError::from)?;
        }
        outcome
    }

    pub fn on_keyboard_interrupt(&self) {
        self.inner.lock().force_stop("keyboard interrupt");
    }

    pub fn on_internal_error(&self) {
        self.inner.lock().force_stop("internal error");
    }

    fn attach_global_output(
        &self,
        phase: Phase,
        report: &mut dyn ReportSink,
    ) -> Result<(), CaptureError> {
        let captured = self.read_global_capture()?;
        if !captured.out().is_empty() {
            report.add_report_section(phase, StreamKey::Stdout, captured.out());
        }
        if !captured.err().is_empty() {
            report.add_report_section(phase, StreamKey::Stderr, captured.err());
        }
        Ok(())
    }
}

impl fmt::Debug for CaptureManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureManager").finish_non_exhaustive()
    }
}

/// What a phase does with the fixture layer on its way out
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FixtureExit {
    Untouched,
    Deactivate,
    /// Deactivate and forget it; the item is finished.
    Release,
}

/// Undoes the resume half of a phase: handles the fixture per
/// [`FixtureExit`] and suspends global capturing, even when the body
/// unwinds.
struct PhaseBracket<'a> {
    manager: &'a CaptureManager,
    fixture_exit: FixtureExit,
    armed: bool,
}

impl<'a> PhaseBracket<'a> {
    fn new(manager: &'a CaptureManager, fixture_exit: FixtureExit) -> Self {
        Self {
            manager,
            fixture_exit,
            armed: true,
        }
    }

    fn close(&self) -> Result<(), CaptureError> {
        let deactivated = match self.fixture_exit {
            FixtureExit::Untouched => Ok(()),
            FixtureExit::Deactivate => self.manager.deactivate_fixture(),
            FixtureExit::Release => self.manager.teardown_fixture(),
        };
        let suspended = self.manager.suspend_global_capture(false);
        deactivated.and(suspended)
    }

    fn exit(mut self) -> Result<(), CaptureError> {
        self.armed = false;
        self.close()
    }
}

impl Drop for PhaseBracket<'_> {
    fn drop(&mut self) {
        if self.armed {
            if let Err(error) = self.close() {
                warn!(%error, "failed to unwind phase capture");
            }
        }
    }
}

/// Resumes whatever [`CaptureManager::global_and_fixture_disabled`]
/// suspended: global first, then the fixture.
#[must_use = "capturing resumes as soon as the guard is dropped"]
pub struct CaptureDisabledGuard {
    manager: CaptureManager,
    fixture: Option<Arc<dyn FixtureControl>>,
    global: bool,
}

impl CaptureDisabledGuard {
    /// Resume capturing now and report failures instead of logging them.
    pub fn release(mut self) -> Result<(), CaptureError> {
        self.resume()
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        let global = if std::mem::take(&mut self.global) {
            self.manager.resume_global_capture()
        } else {
            Ok(())
        };
        let fixture = match self.fixture.take() {
            Some(fixture) => fixture.resume(),
            None => Ok(()),
        };
        global.and(fixture)
    }
}

impl Drop for CaptureDisabledGuard {
    fn drop(&mut self) {
        if let Err(error) = self.resume() {
            warn!(%error, "failed to resume capturing");
        }
    }
}

impl fmt::Debug for CaptureDisabledGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureDisabledGuard")
            .field("global", &self.global)
            .field("fixture", &self.fixture.as_ref().map(|fixture| fixture.kind()))
            .finish()
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
