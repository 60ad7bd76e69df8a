// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Captured output snapshots.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::slot::Slot;

/// Element type of a capture: `String` in text mode, `Vec<u8>` in binary mode
pub trait CaptureData: Clone + Default + fmt::Debug + PartialEq + Send + 'static {
    /// Convert raw captured bytes read from `slot`
    fn decode(slot: Slot, bytes: Vec<u8>) -> Self;

    fn as_bytes(&self) -> &[u8];

    fn append(&mut self, other: Self);

    fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }
}

impl CaptureData for String {
    /// Lossy UTF-8; undecodable bytes become U+FFFD and a warning is logged.
    fn decode(slot: Slot, bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                warn!(
                    %slot,
                    valid_up_to = err.utf8_error().valid_up_to(),
                    "replacing undecodable bytes in captured output"
                );
                String::from_utf8_lossy(err.as_bytes()).into_owned()
            }
        }
    }

    fn as_bytes(&self) -> &[u8] {
        str::as_bytes(self)
    }

    fn append(&mut self, other: Self) {
        self.push_str(&other);
    }
}

impl CaptureData for Vec<u8> {
    fn decode(_slot: Slot, bytes: Vec<u8>) -> Self {
        bytes
    }

    fn as_bytes(&self) -> &[u8] {
        self
    }

    fn append(&mut self, mut other: Self) {
        Vec::append(self, &mut other);
    }
}

/// Output and error text read (and cleared) from a capture
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CaptureResult<T> {
    out: T,
    err: T,
}

impl<T> CaptureResult<T> {
    pub fn new(out: T, err: T) -> Self {
        Self { out, err }
    }

    pub fn out(&self) -> &T {
        &self.out
    }

    pub fn err(&self) -> &T {
        &self.err
    }

    pub fn into_parts(self) -> (T, T) {
        (self.out, self.err)
    }
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;
