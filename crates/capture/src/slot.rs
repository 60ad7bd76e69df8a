// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The three standard stream slots.

use std::fmt;
use std::io;
use std::os::fd::{AsFd, OwnedFd, RawFd};

use serde::Serialize;

/// One of the standard OS streams. The descriptor numbers never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Input,
    Output,
    Error,
}

impl Slot {
    /// Order used when starting or resuming several slots at once.
    pub const START_ORDER: [Slot; 3] = [Slot::Output, Slot::Error, Slot::Input];

    pub fn fd(self) -> RawFd {
        match self {
            Slot::Input => 0,
            Slot::Output => 1,
            Slot::Error => 2,
        }
    }

    /// Duplicate the process descriptor for this slot
    pub(crate) fn duplicate(self) -> io::Result<OwnedFd> {
        match self {
            Slot::Input => io::stdin().as_fd().try_clone_to_owned(),
            Slot::Output => io::stdout().as_fd().try_clone_to_owned(),
            Slot::Error => io::stderr().as_fd().try_clone_to_owned(),
        }
    }

    pub(crate) fn index(self) -> usize {
        self.fd() as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Slot::Input => "stdin",
            Slot::Output => "stdout",
            Slot::Error => "stderr",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
