// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture at the OS file descriptor level.
//!
//! The target descriptor is duplicated to a saved copy and a scratch file is
//! `dup2`-ed over it, so writes from subprocesses and foreign code land in
//! the scratch file too. A nested [`RuntimeCapture`] points the runtime
//! handle at the same scratch file.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::sync::Arc;

use nix::sys::stat::fstat;
use nix::unistd::{close, dup2};
use tracing::{debug, warn};

use super::runtime_capture::RuntimeCapture;
use super::{CaptureTarget, TargetState};
use crate::error::CaptureError;
use crate::runtime::{CaptureRuntime, Sink};
use crate::slot::Slot;

const DEV_NULL: &str = "/dev/null";

/// The descriptor being redirected
#[derive(Debug)]
enum Descriptor {
    Standard(Slot),
    Other(File),
}

impl Descriptor {
    fn raw(&self) -> RawFd {
        match self {
            Descriptor::Standard(slot) => slot.fd(),
            Descriptor::Other(file) => file.as_raw_fd(),
        }
    }

    fn duplicate(&self) -> io::Result<OwnedFd> {
        match self {
            Descriptor::Standard(slot) => slot.duplicate(),
            Descriptor::Other(file) => file.as_fd().try_clone_to_owned(),
        }
    }

    /// Push out anything std is still holding in its line buffer.
    fn flush_std(&self) {
        let flushed = match self {
            Descriptor::Standard(Slot::Output) => io::stdout().flush(),
            Descriptor::Standard(Slot::Error) => io::stderr().flush(),
            _ => Ok(()),
        };
        if let Err(error) = flushed {
            debug!(%error, "flushing std buffer before redirect failed");
        }
    }
}

/// Redirects an OS file descriptor into a scratch file.
///
/// For the input slot the descriptor is pointed at `/dev/null` instead and
/// snapshots are always empty.
#[derive(Debug)]
pub struct DescriptorCapture {
    slot: Slot,
    target: Descriptor,
    scratch: Arc<File>,
    saved: Option<File>,
    placeholder: Option<File>,
    nested: RuntimeCapture,
    state: TargetState,
}

impl DescriptorCapture {
    /// Capture the standard descriptor of `slot`
    pub fn new(runtime: Arc<CaptureRuntime>, slot: Slot) -> Result<Self, CaptureError> {
        Self::build(runtime, slot, Descriptor::Standard(slot))
    }

    /// Capture `file`'s descriptor in place of the standard descriptor of
    /// `slot`. The runtime handle of `slot` is still captured alongside.
    pub fn with_descriptor(
        runtime: Arc<CaptureRuntime>,
        slot: Slot,
        file: File,
    ) -> Result<Self, CaptureError> {
        Self::build(runtime, slot, Descriptor::Other(file))
    }

    fn build(
        runtime: Arc<CaptureRuntime>,
        slot: Slot,
        target: Descriptor,
    ) -> Result<Self, CaptureError> {
        let placeholder = open_placeholder(slot, target.raw())?;
        // Kept off 0-2 so a sibling capture built next still sees its own
        // standard descriptor as closed.
        let (scratch, nested) = match slot {
            Slot::Input => {
                let null = Arc::new(above_standard(File::open(DEV_NULL)?)?);
                (null, RuntimeCapture::new(runtime, slot))
            }
            Slot::Output | Slot::Error => {
                let scratch = Arc::new(above_standard(tempfile::tempfile()?)?);
                let sink = Sink::BackingFile(Arc::clone(&scratch));
                (scratch, RuntimeCapture::with_sink(runtime, slot, sink))
            }
        };
        Ok(Self {
            slot,
            target,
            scratch,
            saved: None,
            placeholder,
            nested,
            state: TargetState::Initialized,
        })
    }

    /// The descriptor number being redirected
    pub fn target_fd(&self) -> RawFd {
        self.target.raw()
    }

    /// Where the original descriptor is parked while capturing
    pub fn saved_descriptor(&self) -> Option<RawFd> {
        self.saved.as_ref().map(AsRawFd::as_raw_fd)
    }

    fn resource_error(&self, fd: RawFd, errno: nix::Error) -> CaptureError {
        CaptureError::Resource {
            slot: self.slot,
            fd,
            source: errno.into(),
        }
    }

    fn redirect(&self, from: RawFd) -> Result<(), CaptureError> {
        let target = self.target.raw();
        dup2(from, target).map_err(|errno| self.resource_error(target, errno))?;
        Ok(())
    }

    fn saved_file(&self) -> Result<&File, CaptureError> {
        self.saved.as_ref().ok_or_else(|| {
            CaptureError::usage(format!("{} capture has no saved descriptor", self.slot))
        })
    }

    /// Fail fast if the saved descriptor was closed behind our back.
    fn saved_fd(&self) -> Result<RawFd, CaptureError> {
        let fd = self.saved_file()?.as_raw_fd();
        fstat(fd).map_err(|errno| self.resource_error(fd, errno))?;
        Ok(fd)
    }

    /// Close the target if it was only open because of the placeholder.
    fn release_placeholder(&mut self) -> Result<(), CaptureError> {
        let Some(placeholder) = self.placeholder.take() else {
            return Ok(());
        };
        let target = self.target.raw();
        if placeholder.as_raw_fd() != target {
            close(target).map_err(|errno| self.resource_error(target, errno))?;
        }
        drop(placeholder);
        Ok(())
    }
}

/// A closed target descriptor cannot be duplicated; park `/dev/null` on it
/// so the capture can proceed. The placeholder is closed again on stop.
fn open_placeholder(slot: Slot, target: RawFd) -> Result<Option<File>, CaptureError> {
    let Err(errno) = fstat(target) else {
        return Ok(None);
    };
    warn!(
        %slot,
        fd = target,
        %errno,
        "descriptor is not open; capturing into a /dev/null placeholder"
    );
    let mut placeholder = OpenOptions::new().read(true).write(true).open(DEV_NULL)?;
    if placeholder.as_raw_fd() != target {
        placeholder = above_standard(placeholder)?;
        dup2(placeholder.as_raw_fd(), target).map_err(|errno| CaptureError::Resource {
            slot,
            fd: target,
            source: errno.into(),
        })?;
    }
    Ok(Some(placeholder))
}

/// Re-home `file` on a descriptor above stderr. Low numbers it passes
/// through are closed again on return.
fn above_standard(file: File) -> io::Result<File> {
    let mut file = file;
    let mut low = Vec::new();
    while file.as_raw_fd() <= Slot::Error.fd() {
        let moved = file.try_clone()?;
        low.push(file);
        file = moved;
    }
    Ok(file)
}

impl CaptureTarget for DescriptorCapture {
    fn slot(&self) -> Slot {
        self.slot
    }

    fn state(&self) -> TargetState {
        self.state
    }

    fn start(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("start", self.slot, &[TargetState::Initialized])?;
        self.target.flush_std();

        let target = self.target.raw();
        let saved = self
            .target
            .duplicate()
            .and_then(|saved| above_standard(File::from(saved)))
            .map_err(|source| CaptureError::Resource {
                slot: self.slot,
                fd: target,
                source,
            })?;
        self.saved = Some(saved);
        self.redirect(self.scratch.as_raw_fd())?;
        self.nested.start()?;

        self.state = TargetState::Started;
        debug!(slot = %self.slot, fd = target, "descriptor capture started");
        Ok(())
    }

    fn snapshot(&mut self) -> Result<Vec<u8>, CaptureError> {
        self.state.ensure("snapshot", self.slot, TargetState::ACTIVE)?;
        if self.slot == Slot::Input {
            return Ok(Vec::new());
        }
        self.target.flush_std();
        Ok(Sink::BackingFile(Arc::clone(&self.scratch)).take()?)
    }

    fn suspend(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("suspend", self.slot, TargetState::ACTIVE)?;
        self.target.flush_std();
        let saved = self.saved_fd()?;
        self.nested.suspend()?;
        self.redirect(saved)?;
        self.state = TargetState::Suspended;
        Ok(())
    }

    fn resume(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("resume", self.slot, TargetState::ACTIVE)?;
        self.target.flush_std();
        self.saved_fd()?;
        self.nested.resume()?;
        self.redirect(self.scratch.as_raw_fd())?;
        self.state = TargetState::Started;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        self.state.ensure("stop", self.slot, TargetState::STOPPABLE)?;
        if self.state == TargetState::Initialized {
            self.release_placeholder()?;
            self.nested.stop()?;
            self.state = TargetState::Done;
            return Ok(());
        }

        self.target.flush_std();
        let saved = self.saved_fd()?;
        self.redirect(saved)?;
        self.saved = None;
        self.release_placeholder()?;
        self.nested.stop()?;

        self.state = TargetState::Done;
        debug!(slot = %self.slot, fd = self.target.raw(), "descriptor capture stopped");
        Ok(())
    }

    fn write_original(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        self.state.ensure("write_original", self.slot, TargetState::ACTIVE)?;
        let mut saved = self.saved_file()?;
        saved.write_all(data)?;
        Ok(())
    }
}

impl Drop for DescriptorCapture {
    fn drop(&mut self) {
        if let Some(saved) = self.saved.take() {
            let target = self.target.raw();
            if let Err(errno) = dup2(saved.as_raw_fd(), target) {
                warn!(
                    slot = %self.slot,
                    fd = target,
                    %errno,
                    "failed to restore descriptor on drop"
                );
            }
        }
        if let Err(error) = self.release_placeholder() {
            warn!(slot = %self.slot, %error, "failed to release placeholder descriptor on drop");
        }
    }
}

#[cfg(test)]
#[path = "descriptor_tests.rs"]
mod tests;
