// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::runtime::{Handle, SharedBuffer, Sink};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};

struct Console {
    runtime: Arc<CaptureRuntime>,
    out: SharedBuffer,
    err: SharedBuffer,
}

fn console() -> Console {
    let out = SharedBuffer::new();
    let err = SharedBuffer::new();
    let runtime = Arc::new(CaptureRuntime::with_handles(
        Handle::Sink(Sink::Memory(SharedBuffer::with_contents("line\n"))),
        Handle::Sink(Sink::Memory(out.clone())),
        Handle::Sink(Sink::Memory(err.clone())),
    ));
    Console { runtime, out, err }
}

fn sys_capture(console: &Console) -> MultiCapture<String> {
    let mut capture = MultiCapture::for_method(CaptureMethod::Sys, &console.runtime).unwrap();
    capture.start().unwrap();
    capture
}

#[test]
fn test_read_returns_out_and_err() {
    let console = console();
    let mut capture = sys_capture(&console);

    console.runtime.println("to out").unwrap();
    console.runtime.eprintln("to err").unwrap();

    let result = capture.read().unwrap();
    assert_eq!(result.out(), "to out\n");
    assert_eq!(result.err(), "to err\n");

    let again = capture.read().unwrap();
    assert_eq!(again.out(), "");
    assert_eq!(again.err(), "");
    capture.stop().unwrap();
}

#[test]
fn test_pop_and_flush_matches_read_and_reaches_console() {
    let console = console();
    let mut capture = sys_capture(&console);

    console.runtime.print("kept").unwrap();
    console.runtime.eprint("also kept").unwrap();

    let result = capture.pop_and_flush_to_original().unwrap();
    assert_eq!(result.out(), "kept");
    assert_eq!(result.err(), "also kept");
    assert_eq!(console.out.contents(), b"kept");
    assert_eq!(console.err.contents(), b"also kept");
    capture.stop().unwrap();
}

#[test]
fn test_double_stop_is_usage_error() {
    let console = console();
    let mut capture = sys_capture(&console);

    capture.stop().unwrap();
    assert!(capture.is_stopped());
    let err = capture.stop().unwrap_err();
    assert!(err.is_usage());
    assert_eq!(err.to_string(), "capture was already stopped");
}

#[test]
fn test_start_twice_fails() {
    let console = console();
    let mut capture = sys_capture(&console);
    assert!(capture.start().unwrap_err().is_usage());
    capture.stop().unwrap();
}

#[test]
fn test_suspend_leaves_input_captured_by_default() {
    let console = console();
    let mut capture = sys_capture(&console);

    capture.suspend(false).unwrap();
    assert!(!capture.is_started());
    assert!(matches!(
        console.runtime.read_line(),
        Err(CaptureError::BlockedRead)
    ));
    console.runtime.print("visible").unwrap();
    capture.resume().unwrap();

    assert_eq!(console.out.contents(), b"visible");
    capture.stop().unwrap();
}

#[test]
fn test_suspend_with_input_allows_reads() {
    let console = console();
    let mut capture = sys_capture(&console);

    capture.suspend(true).unwrap();
    assert_eq!(console.runtime.read_line().unwrap(), "line\n");
    capture.resume().unwrap();
    assert!(capture.is_started());
    assert!(matches!(
        console.runtime.read_line(),
        Err(CaptureError::BlockedRead)
    ));
    capture.stop().unwrap();
}

#[test]
fn test_suspend_preserves_unread_output() {
    let console = console();
    let mut capture = sys_capture(&console);

    console.runtime.print("w1 ").unwrap();
    capture.suspend(false).unwrap();
    capture.resume().unwrap();
    console.runtime.print("w2").unwrap();

    assert_eq!(capture.read().unwrap().out(), "w1 w2");
    capture.stop().unwrap();
}

#[test]
fn test_no_method_reads_empty_and_leaves_streams() {
    let console = console();
    let mut capture: MultiCapture<String> =
        MultiCapture::for_method(CaptureMethod::No, &console.runtime).unwrap();
    capture.start().unwrap();

    console.runtime.print("straight through").unwrap();

    assert_eq!(capture.read().unwrap(), CaptureResult::default());
    assert_eq!(console.out.contents(), b"straight through");
    capture.stop().unwrap();
}

#[test]
fn test_tee_sys_shows_and_keeps() {
    let console = console();
    let mut capture: MultiCapture<String> =
        MultiCapture::for_method(CaptureMethod::TeeSys, &console.runtime).unwrap();
    capture.start().unwrap();

    console.runtime.print("both").unwrap();

    assert_eq!(capture.read().unwrap().out(), "both");
    assert_eq!(console.out.contents(), b"both");
    assert_eq!(console.runtime.read_line().unwrap(), "line\n");
    capture.stop().unwrap();
}

#[test]
fn test_binary_results() {
    let console = console();
    let mut capture: MultiCapture<Vec<u8>> =
        MultiCapture::for_method(CaptureMethod::Sys, &console.runtime).unwrap();
    capture.start().unwrap();

    console.runtime.write(Slot::Output, b"\xff\x00").unwrap();

    assert_eq!(capture.read().unwrap().out(), &vec![0xff, 0x00]);
    capture.stop().unwrap();
}

#[test]
fn test_absent_targets_read_empty() {
    let console = console();
    let mut capture: MultiCapture<String> = MultiCapture::new(
        None,
        Some(Box::new(RuntimeCapture::new(Arc::clone(&console.runtime), Slot::Output))),
        None,
    );
    capture.start().unwrap();

    console.runtime.print("out").unwrap();
    console.runtime.eprint("err").unwrap();

    let result = capture.read().unwrap();
    assert_eq!(result.out(), "out");
    assert_eq!(result.err(), "");
    assert_eq!(console.err.contents(), b"err");
    capture.stop().unwrap();
}

#[test]
fn test_operations_require_start() {
    let console = console();
    let mut capture: MultiCapture<String> =
        MultiCapture::for_method(CaptureMethod::Sys, &console.runtime).unwrap();

    assert!(capture.suspend(false).unwrap_err().is_usage());
    assert!(capture.resume().unwrap_err().is_usage());
    capture.stop().unwrap();
}

#[test]
fn test_descriptor_flush_to_original() {
    let console = console();
    let real = tempfile::tempfile().unwrap();
    let mut reader = real.try_clone().unwrap();
    let stand_in: File = real;
    let mut capture: MultiCapture<String> = MultiCapture::new(
        None,
        Some(Box::new(
            DescriptorCapture::with_descriptor(Arc::clone(&console.runtime), Slot::Output, stand_in)
                .unwrap(),
        )),
        None,
    );
    capture.start().unwrap();

    console.runtime.println("captured line").unwrap();
    let result = capture.pop_and_flush_to_original().unwrap();
    capture.stop().unwrap();

    reader.seek(SeekFrom::Start(0)).unwrap();
    let mut shown = String::new();
    reader.read_to_string(&mut shown).unwrap();
    assert_eq!(result.out(), "captured line\n");
    assert_eq!(shown, "captured line\n");
}
