// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use clap::Parser;
use rstest::rstest;

#[derive(Parser, Debug)]
struct Host {
    #[command(flatten)]
    capture: CaptureArgs,
}

#[rstest]
#[case("fd", CaptureMethod::Fd)]
#[case("sys", CaptureMethod::Sys)]
#[case("no", CaptureMethod::No)]
#[case("tee-sys", CaptureMethod::TeeSys)]
fn test_parse_method(#[case] text: &str, #[case] expected: CaptureMethod) {
    let method: CaptureMethod = text.parse().unwrap();
    assert_eq!(method, expected);
    assert_eq!(method.to_string(), text);
}

#[test]
fn test_parse_unknown_method() {
    let err = "file".parse::<CaptureMethod>().unwrap_err();
    assert!(matches!(err, CaptureError::InvalidMethod(ref m) if m == "file"));
}

#[test]
fn test_cli_capture_flag() {
    let host = Host::try_parse_from(["host", "--capture", "tee-sys"]).unwrap();
    assert_eq!(host.capture.method(), CaptureMethod::TeeSys);
}

#[test]
fn test_cli_s_forces_no() {
    let host = Host::try_parse_from(["host", "--capture", "sys", "-s"]).unwrap();
    assert_eq!(host.capture.method(), CaptureMethod::No);
}

#[test]
fn test_cli_rejects_unknown_method() {
    assert!(Host::try_parse_from(["host", "--capture", "file"]).is_err());
}

#[test]
fn test_serializes_kebab_case() {
    let json = serde_json::to_string(&CaptureMethod::TeeSys).unwrap();
    assert_eq!(json, r#""tee-sys""#);
}
