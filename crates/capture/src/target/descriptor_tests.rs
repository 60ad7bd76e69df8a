// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::runtime::{Handle, SharedBuffer};
use std::io::{Read, Seek, SeekFrom};

/// A scratch file standing in for the real console, plus a second handle
/// on the same open file for reading back what reached it.
fn console() -> (File, File) {
    let file = tempfile::tempfile().unwrap();
    let reader = file.try_clone().unwrap();
    (file, reader)
}

fn console_contents(reader: &mut File) -> String {
    reader.seek(SeekFrom::Start(0)).unwrap();
    let mut text = String::new();
    reader.read_to_string(&mut text).unwrap();
    text
}

fn runtime() -> Arc<CaptureRuntime> {
    Arc::new(CaptureRuntime::with_handles(
        Handle::Sink(Sink::Null),
        Handle::Sink(Sink::memory()),
        Handle::Sink(Sink::memory()),
    ))
}

/// Write through the redirected descriptor number itself
fn write_target(capture: &DescriptorCapture, data: &[u8]) {
    match &capture.target {
        Descriptor::Other(file) => {
            let mut file: &File = file;
            file.write_all(data).unwrap();
        }
        Descriptor::Standard(_) => panic!("test capture must use a stand-in descriptor"),
    }
}

fn started(runtime: &Arc<CaptureRuntime>, file: File) -> DescriptorCapture {
    let mut capture =
        DescriptorCapture::with_descriptor(Arc::clone(runtime), Slot::Output, file).unwrap();
    capture.start().unwrap();
    capture
}

#[test]
fn test_descriptor_writes_are_captured() {
    let runtime = runtime();
    let (file, mut reader) = console();
    let mut capture = started(&runtime, file);

    write_target(&capture, b"hello\n");
    assert_eq!(capture.snapshot().unwrap(), b"hello\n");
    assert!(capture.snapshot().unwrap().is_empty());

    capture.stop().unwrap();
    assert_eq!(console_contents(&mut reader), "");
}

#[test]
fn test_runtime_and_descriptor_share_scratch_file() {
    let runtime = runtime();
    let (file, _reader) = console();
    let mut capture = started(&runtime, file);

    write_target(&capture, b"hello\n");
    runtime.println("world").unwrap();

    assert_eq!(capture.snapshot().unwrap(), b"hello\nworld\n");
    capture.stop().unwrap();
}

#[test]
fn test_snapshot_clears_between_writes() {
    let runtime = runtime();
    let (file, _reader) = console();
    let mut capture = started(&runtime, file);

    write_target(&capture, b"first");
    capture.snapshot().unwrap();
    write_target(&capture, b"second");

    assert_eq!(capture.snapshot().unwrap(), b"second");
    capture.stop().unwrap();
}

#[test]
fn test_suspend_routes_to_original() {
    let runtime = runtime();
    let (file, mut reader) = console();
    let mut capture = started(&runtime, file);

    write_target(&capture, b"one ");
    capture.suspend().unwrap();
    write_target(&capture, b"between");
    capture.resume().unwrap();
    write_target(&capture, b"two");

    assert_eq!(capture.snapshot().unwrap(), b"one two");
    assert_eq!(console_contents(&mut reader), "between");
    capture.stop().unwrap();
}

#[test]
fn test_stop_restores_descriptor() {
    let runtime = runtime();
    let (file, mut reader) = console();
    let mut capture = started(&runtime, file);

    write_target(&capture, b"captured");
    capture.stop().unwrap();
    write_target(&capture, b"restored");

    assert_eq!(console_contents(&mut reader), "restored");
    assert!(capture.saved_descriptor().is_none());
}

#[test]
fn test_double_stop_fails() {
    let runtime = runtime();
    let (file, _reader) = console();
    let mut capture = started(&runtime, file);

    capture.stop().unwrap();
    let err = capture.stop().unwrap_err();
    assert!(err.is_usage());
}

#[test]
fn test_write_original_reaches_console() {
    let runtime = runtime();
    let (file, mut reader) = console();
    let mut capture = started(&runtime, file);

    capture.write_original(b"flushed").unwrap();

    assert_eq!(console_contents(&mut reader), "flushed");
    assert!(capture.snapshot().unwrap().is_empty());
    capture.stop().unwrap();
}

#[test]
fn test_runtime_handle_restored_on_stop() {
    let out = SharedBuffer::new();
    let runtime = Arc::new(CaptureRuntime::with_handles(
        Handle::Sink(Sink::Null),
        Handle::Sink(Sink::Memory(out.clone())),
        Handle::Sink(Sink::memory()),
    ));
    let (file, _reader) = console();
    let mut capture = started(&runtime, file);

    runtime.print("captured").unwrap();
    capture.stop().unwrap();
    runtime.print("visible").unwrap();

    assert_eq!(out.contents(), b"visible");
}

#[test]
fn test_invalid_utf8_is_kept_as_bytes() {
    let runtime = runtime();
    let (file, _reader) = console();
    let mut capture = started(&runtime, file);

    write_target(&capture, b"\xff\xfe");
    assert_eq!(capture.snapshot().unwrap(), b"\xff\xfe");
    capture.stop().unwrap();
}

#[test]
fn test_stop_before_start() {
    let runtime = runtime();
    let (file, _reader) = console();
    let mut capture =
        DescriptorCapture::with_descriptor(Arc::clone(&runtime), Slot::Output, file).unwrap();

    capture.stop().unwrap();
    assert_eq!(capture.state(), TargetState::Done);
    assert!(capture.start().unwrap_err().is_usage());
}

#[test]
fn test_above_standard_keeps_high_descriptors() {
    let file = tempfile::tempfile().unwrap();
    let fd = file.as_raw_fd();
    let moved = above_standard(file).unwrap();
    assert!(fd > 2);
    assert_eq!(moved.as_raw_fd(), fd);
}
