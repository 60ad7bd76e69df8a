// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime-level stream table.
//!
//! Rust code has no rebindable global `stdout`, so the handles that code
//! under test writes through live in an explicit [`CaptureRuntime`]. A
//! runtime capture swaps the [`Handle`] installed for a slot; a descriptor
//! capture redirects the OS descriptor underneath it.

use std::fs::File;
use std::io::{self, BufRead, Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::CaptureError;
use crate::slot::Slot;

/// Growable byte buffer shared between a sink and whoever drains it
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer pre-filled with `data`, e.g. canned input for a stdin stand-in
    pub fn with_contents(data: impl Into<Vec<u8>>) -> Self {
        Self(Arc::new(Mutex::new(data.into())))
    }

    pub fn write(&self, data: &[u8]) {
        self.0.lock().extend_from_slice(data);
    }

    /// Remove and return everything written so far
    pub fn take(&self) -> Vec<u8> {
        std::mem::take(&mut *self.0.lock())
    }

    /// Copy of the current contents, leaving them in place
    pub fn contents(&self) -> Vec<u8> {
        self.0.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    fn read_into(&self, buf: &mut [u8]) -> usize {
        let mut data = self.0.lock();
        let n = buf.len().min(data.len());
        buf[..n].copy_from_slice(&data[..n]);
        data.drain(..n);
        n
    }

    fn read_line_into(&self, line: &mut String) -> usize {
        let mut data = self.0.lock();
        let end = data
            .iter()
            .position(|&b| b == b'\n')
            .map_or(data.len(), |i| i + 1);
        let chunk: Vec<u8> = data.drain(..end).collect();
        line.push_str(&String::from_utf8_lossy(&chunk));
        chunk.len()
    }
}

/// Destination a capture substitutes for a slot's real destination
#[derive(Clone, Debug)]
pub enum Sink {
    /// In-memory buffer
    Memory(SharedBuffer),
    /// Scratch file that an OS descriptor has also been pointed at
    BackingFile(Arc<File>),
    /// Discards writes; refuses reads
    Null,
}

impl Sink {
    pub fn memory() -> Self {
        Sink::Memory(SharedBuffer::new())
    }

    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        match self {
            Sink::Memory(buffer) => {
                buffer.write(data);
                Ok(())
            }
            Sink::BackingFile(file) => {
                let mut file: &File = file;
                file.write_all(data)?;
                file.flush()
            }
            Sink::Null => Ok(()),
        }
    }

    /// Destructive read: returns everything written since the last call and
    /// leaves the sink empty.
    pub fn take(&self) -> io::Result<Vec<u8>> {
        match self {
            Sink::Memory(buffer) => Ok(buffer.take()),
            Sink::BackingFile(file) => {
                let mut file: &File = file;
                file.seek(SeekFrom::Start(0))?;
                let mut data = Vec::new();
                file.read_to_end(&mut data)?;
                file.seek(SeekFrom::Start(0))?;
                file.set_len(0)?;
                Ok(data)
            }
            Sink::Null => Ok(Vec::new()),
        }
    }
}

/// What a slot currently writes to (or reads from)
#[derive(Clone, Debug)]
pub enum Handle {
    /// The real process stream (`std::io::stdout()` and friends)
    Process(Slot),
    /// An open file standing in for the process stream
    File(Arc<File>),
    /// A capture sink
    Sink(Sink),
    /// Write to `buffer` and pass through to the handle it replaced
    Tee {
        buffer: SharedBuffer,
        passthrough: Box<Handle>,
    },
}

impl Handle {
    pub fn write(&self, data: &[u8]) -> io::Result<()> {
        match self {
            // Flush immediately so nothing sits in the std line buffer when
            // a descriptor gets redirected underneath it.
            Handle::Process(Slot::Output) => {
                let mut out = io::stdout().lock();
                out.write_all(data)?;
                out.flush()
            }
            Handle::Process(Slot::Error) => {
                let mut err = io::stderr().lock();
                err.write_all(data)?;
                err.flush()
            }
            Handle::Process(Slot::Input) => Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stdin is not writable",
            )),
            Handle::File(file) => {
                let mut file: &File = file;
                file.write_all(data)?;
                file.flush()
            }
            Handle::Sink(sink) => sink.write(data),
            Handle::Tee {
                buffer,
                passthrough,
            } => {
                buffer.write(data);
                passthrough.write(data)
            }
        }
    }

    pub fn read(&self, buf: &mut [u8]) -> Result<usize, CaptureError> {
        match self {
            Handle::Process(Slot::Input) => Ok(io::stdin().lock().read(buf)?),
            Handle::File(file) => {
                let mut file: &File = file;
                Ok(file.read(buf)?)
            }
            Handle::Sink(Sink::Memory(buffer)) => Ok(buffer.read_into(buf)),
            Handle::Sink(Sink::Null) => Err(CaptureError::BlockedRead),
            other => Err(CaptureError::usage(format!(
                "handle is not readable: {}",
                other.describe()
            ))),
        }
    }

    pub fn read_line(&self, line: &mut String) -> Result<usize, CaptureError> {
        match self {
            Handle::Process(Slot::Input) => Ok(io::stdin().lock().read_line(line)?),
            Handle::Sink(Sink::Memory(buffer)) => Ok(buffer.read_line_into(line)),
            Handle::Sink(Sink::Null) => Err(CaptureError::BlockedRead),
            other => Err(CaptureError::usage(format!(
                "handle does not support line reads: {}",
                other.describe()
            ))),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Handle::Process(_) => "process stream",
            Handle::File(_) => "file",
            Handle::Sink(Sink::Memory(_)) => "memory sink",
            Handle::Sink(Sink::BackingFile(_)) => "backing file sink",
            Handle::Sink(Sink::Null) => "null sink",
            Handle::Tee { .. } => "tee",
        }
    }
}

/// The handles code under test reads and writes through, one per slot.
///
/// Shared as `Arc<CaptureRuntime>` between the capture manager, every
/// runtime capture target, and the code whose output is captured.
#[derive(Debug)]
pub struct CaptureRuntime {
    handles: Mutex<[Handle; 3]>,
}

impl CaptureRuntime {
    /// Runtime attached to the real process streams
    pub fn new() -> Self {
        Self::with_handles(
            Handle::Process(Slot::Input),
            Handle::Process(Slot::Output),
            Handle::Process(Slot::Error),
        )
    }

    /// Runtime whose "real console" is something other than the process streams
    pub fn with_handles(input: Handle, output: Handle, error: Handle) -> Self {
        Self {
            handles: Mutex::new([input, output, error]),
        }
    }

    pub fn current(&self, slot: Slot) -> Handle {
        self.handles.lock()[slot.index()].clone()
    }

    /// Install `handle` for `slot`, returning the one it replaced
    pub fn set_current(&self, slot: Slot, handle: Handle) -> Handle {
        std::mem::replace(&mut self.handles.lock()[slot.index()], handle)
    }

    pub fn write(&self, slot: Slot, data: &[u8]) -> io::Result<()> {
        // Clone out so the table is not locked while writing.
        let handle = self.current(slot);
        handle.write(data)
    }

    pub fn print(&self, text: &str) -> io::Result<()> {
        self.write(Slot::Output, text.as_bytes())
    }

    pub fn println(&self, text: &str) -> io::Result<()> {
        self.write(Slot::Output, format!("{text}\n").as_bytes())
    }

    pub fn eprint(&self, text: &str) -> io::Result<()> {
        self.write(Slot::Error, text.as_bytes())
    }

    pub fn eprintln(&self, text: &str) -> io::Result<()> {
        self.write(Slot::Error, format!("{text}\n").as_bytes())
    }

    /// Read one line from the input slot.
    ///
    /// Fails with [`CaptureError::BlockedRead`] while stdin is captured.
    pub fn read_line(&self) -> Result<String, CaptureError> {
        let handle = self.current(Slot::Input);
        let mut line = String::new();
        handle.read_line(&mut line)?;
        Ok(line)
    }

    pub fn stdout(self: &Arc<Self>) -> RuntimeStream {
        RuntimeStream::new(Arc::clone(self), Slot::Output)
    }

    pub fn stderr(self: &Arc<Self>) -> RuntimeStream {
        RuntimeStream::new(Arc::clone(self), Slot::Error)
    }

    pub fn stdin(self: &Arc<Self>) -> RuntimeStream {
        RuntimeStream::new(Arc::clone(self), Slot::Input)
    }
}

impl Default for CaptureRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// `io::Write`/`io::Read` adaptor over one runtime slot.
///
/// Looks up the slot's handle on every call, so a stream obtained before a
/// capture started still follows the capture.
#[derive(Clone, Debug)]
pub struct RuntimeStream {
    runtime: Arc<CaptureRuntime>,
    slot: Slot,
}

impl RuntimeStream {
    fn new(runtime: Arc<CaptureRuntime>, slot: Slot) -> Self {
        Self { runtime, slot }
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }
}

impl Write for RuntimeStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.runtime.write(self.slot, buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for RuntimeStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.runtime
            .current(self.slot)
            .read(buf)
            .map_err(|e| match e {
                CaptureError::Io(io) => io,
                other => io::Error::other(other),
            })
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
