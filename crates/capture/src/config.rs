// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Capture method selection.

use std::fmt;
use std::str::FromStr;

use clap::{Args, ValueEnum};
use serde::Serialize;

use crate::error::CaptureError;

/// How the global capture layer redirects the standard streams
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CaptureMethod {
    /// Redirect OS descriptors 0, 1 and 2
    #[default]
    Fd,
    /// Swap the runtime handles only
    Sys,
    /// Leave every stream alone
    No,
    /// Swap runtime handles for stdout/stderr but still show the output
    TeeSys,
}

impl CaptureMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CaptureMethod::Fd => "fd",
            CaptureMethod::Sys => "sys",
            CaptureMethod::No => "no",
            CaptureMethod::TeeSys => "tee-sys",
        }
    }
}

impl fmt::Display for CaptureMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CaptureMethod {
    type Err = CaptureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fd" => Ok(CaptureMethod::Fd),
            "sys" => Ok(CaptureMethod::Sys),
            "no" => Ok(CaptureMethod::No),
            "tee-sys" => Ok(CaptureMethod::TeeSys),
            other => Err(CaptureError::InvalidMethod(other.to_string())),
        }
    }
}

/// Capture flags a host runner flattens into its own CLI
#[derive(Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureArgs {
    /// Per-test capturing method
    #[arg(long = "capture", value_enum, env = "STDCAP_CAPTURE", default_value = "fd")]
    pub capture: CaptureMethod,

    /// Shortcut for --capture=no
    #[arg(short = 's')]
    pub no_capture: bool,
}

impl CaptureArgs {
    pub fn method(&self) -> CaptureMethod {
        if self.no_capture {
            CaptureMethod::No
        } else {
            self.capture
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
