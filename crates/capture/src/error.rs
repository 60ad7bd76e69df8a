// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture error taxonomy.

use std::os::fd::RawFd;

use thiserror::Error;

use crate::slot::Slot;

/// Errors raised by capture targets and the capture manager
#[derive(Debug, Error)]
pub enum CaptureError {
    /// Programmer misuse: wrong lifecycle order, conflicting fixtures
    #[error("{0}")]
    Usage(String),

    /// Something tried to read stdin while it was captured
    #[error("reading from stdin while output is captured; consider disabling capture")]
    BlockedRead,

    /// A descriptor could not be duplicated, or went stale before restore
    #[error("descriptor {fd} for {slot} is not usable: {source}")]
    Resource {
        slot: Slot,
        fd: RawFd,
        #[source]
        source: std::io::Error,
    },

    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown capture method '{0}' (expected fd, sys, no or tee-sys)")]
    InvalidMethod(String),
}

impl CaptureError {
    pub(crate) fn usage(message: impl Into<String>) -> Self {
        Self::Usage(message.into())
    }

    /// True for programmer misuse, including blocked stdin reads.
    pub fn is_usage(&self) -> bool {
        matches!(self, Self::Usage(_) | Self::BlockedRead)
    }

    /// True when the OS descriptor table could not be restored.
    pub fn is_resource(&self) -> bool {
        matches!(self, Self::Resource { .. })
    }
}
