// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::runtime::SharedBuffer;
use proptest::prelude::*;

fn console() -> (Arc<CaptureRuntime>, SharedBuffer) {
    let out = SharedBuffer::new();
    let runtime = CaptureRuntime::with_handles(
        Handle::Sink(Sink::Memory(SharedBuffer::with_contents("typed\n"))),
        Handle::Sink(Sink::Memory(out.clone())),
        Handle::Sink(Sink::memory()),
    );
    (Arc::new(runtime), out)
}

#[test]
fn test_snapshot_returns_writes_and_clears() {
    let (runtime, console_out) = console();
    let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
    capture.start().unwrap();

    runtime.print("hello").unwrap();
    assert_eq!(capture.snapshot().unwrap(), b"hello");
    assert!(capture.snapshot().unwrap().is_empty());

    runtime.print("w1").unwrap();
    capture.snapshot().unwrap();
    runtime.print("w2").unwrap();
    assert_eq!(capture.snapshot().unwrap(), b"w2");

    capture.stop().unwrap();
    assert!(console_out.is_empty());
}

#[test]
fn test_suspend_keeps_unread_data() {
    let (runtime, console_out) = console();
    let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
    capture.start().unwrap();

    runtime.print("one ").unwrap();
    capture.suspend().unwrap();
    runtime.print("console").unwrap();
    capture.resume().unwrap();
    runtime.print("two").unwrap();

    assert_eq!(capture.snapshot().unwrap(), b"one two");
    assert_eq!(console_out.contents(), b"console");
    capture.stop().unwrap();
}

#[test]
fn test_stop_restores_original_and_rejects_second_stop() {
    let (runtime, console_out) = console();
    let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
    capture.start().unwrap();
    capture.stop().unwrap();

    runtime.print("after").unwrap();
    assert_eq!(console_out.contents(), b"after");

    let err = capture.stop().unwrap_err();
    assert!(err.is_usage());
}

#[test]
fn test_write_original_bypasses_sink() {
    let (runtime, console_out) = console();
    let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
    capture.start().unwrap();

    capture.write_original(b"replayed").unwrap();

    assert_eq!(console_out.contents(), b"replayed");
    assert!(capture.snapshot().unwrap().is_empty());
    capture.stop().unwrap();
}

#[test]
fn test_captured_input_blocks_reads() {
    let (runtime, _out) = console();
    let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Input);
    capture.start().unwrap();

    assert!(matches!(runtime.read_line(), Err(CaptureError::BlockedRead)));
    assert!(capture.snapshot().unwrap().is_empty());

    capture.suspend().unwrap();
    assert_eq!(runtime.read_line().unwrap(), "typed\n");
    capture.stop().unwrap();
}

#[test]
fn test_tee_passes_through() {
    let (runtime, console_out) = console();
    let mut capture = RuntimeCapture::tee(Arc::clone(&runtime), Slot::Output);
    capture.start().unwrap();

    runtime.print("shown and kept").unwrap();

    assert_eq!(capture.snapshot().unwrap(), b"shown and kept");
    assert_eq!(console_out.contents(), b"shown and kept");
    capture.stop().unwrap();
}

#[test]
fn test_nested_captures_unwind_in_order() {
    let (runtime, console_out) = console();
    let mut outer = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
    let mut inner = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
    outer.start().unwrap();
    inner.start().unwrap();

    runtime.print("inner").unwrap();
    inner.stop().unwrap();
    runtime.print("outer").unwrap();
    outer.stop().unwrap();

    assert_eq!(inner.sink.take().unwrap(), b"inner");
    assert!(console_out.is_empty());
}

#[test]
fn test_drop_restores_handle() {
    let (runtime, console_out) = console();
    {
        let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
        capture.start().unwrap();
    }
    runtime.print("visible").unwrap();
    assert_eq!(console_out.contents(), b"visible");
}

#[test]
fn test_operations_before_start_fail() {
    let (runtime, _out) = console();
    let mut capture = RuntimeCapture::new(runtime, Slot::Error);

    assert!(capture.snapshot().unwrap_err().is_usage());
    assert!(capture.suspend().unwrap_err().is_usage());
    assert!(capture.resume().unwrap_err().is_usage());
    capture.stop().unwrap();
}

proptest! {
    #[test]
    fn prop_snapshot_round_trips(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..64), 0..8)
    ) {
        let (runtime, _out) = console();
        let mut capture = RuntimeCapture::new(Arc::clone(&runtime), Slot::Output);
        capture.start().unwrap();

        let mut expected = Vec::new();
        for chunk in &chunks {
            runtime.write(Slot::Output, chunk).unwrap();
            expected.extend_from_slice(chunk);
        }

        prop_assert_eq!(capture.snapshot().unwrap(), expected);
        prop_assert!(capture.snapshot().unwrap().is_empty());
        capture.stop().unwrap();
    }
}
