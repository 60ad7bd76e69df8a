// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Console stream quirks.
//!
//! On Windows the console handles behind the runtime streams do not follow
//! a `dup2` of descriptors 1 and 2. Before the first descriptor capture is
//! installed there, the runtime's output handles are re-opened through
//! duplicated descriptors so that suspend/resume swap well-defined files.

use std::fs::File;
use std::sync::Arc;

use tracing::debug;

use crate::error::CaptureError;
use crate::runtime::{CaptureRuntime, Handle};
use crate::slot::Slot;

/// Whether [`prepare_console_streams`] has work to do on this platform
pub fn console_needs_reopen() -> bool {
    cfg!(windows)
}

/// Re-open the runtime's output handles if this platform needs it.
///
/// Returns whether anything was re-opened.
pub fn prepare_console_streams(runtime: &CaptureRuntime) -> Result<bool, CaptureError> {
    if !console_needs_reopen() {
        return Ok(false);
    }
    reopen_standard_streams(runtime)?;
    Ok(true)
}

/// Point the runtime's stdout/stderr handles at fresh duplicates of the
/// process descriptors.
pub fn reopen_standard_streams(runtime: &CaptureRuntime) -> Result<(), CaptureError> {
    for slot in [Slot::Output, Slot::Error] {
        let duplicate = slot.duplicate().map_err(|source| CaptureError::Resource {
            slot,
            fd: slot.fd(),
            source,
        })?;
        runtime.set_current(slot, Handle::File(Arc::new(File::from(duplicate))));
        debug!(%slot, "re-opened runtime stream through a duplicated descriptor");
    }
    Ok(())
}

#[cfg(test)]
#[path = "platform_tests.rs"]
mod tests;
