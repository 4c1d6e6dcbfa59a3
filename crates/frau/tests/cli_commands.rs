#![cfg(feature = "cli")]

use std::process::Command;

fn frau(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_frau"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("frau should run")
}

#[test]
fn version_prints_package_version() {
    let output = frau(&["version"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("frau {}", env!("CARGO_PKG_VERSION")));
}

#[test]
fn request_outputs_responses_as_json() {
    let output = frau(&[
        "--format", "json", "request", "time", "--value", "42", "--calls", "2", "--delay", "20ms",
    ]);
    assert!(output.status.success());

    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["request_type"], "time");
    assert_eq!(report["server_invocations"], 1);
    assert_eq!(
        report["responses"],
        serde_json::json!([{ "id": 1, "value": 42 }, { "id": 2, "value": 42 }])
    );
}

#[test]
fn request_with_invalid_value_exits_64() {
    let output = frau(&["request", "time", "--value", "{oops"]);
    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--value is not valid JSON"));
}

#[test]
fn event_prints_each_delivery() {
    let output = frau(&[
        "--format",
        "pretty",
        "event",
        "ping",
        "--payload",
        "{\"n\":1}",
        "--listeners",
        "2",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ping -> listener 1: {\"n\":1}"));
    assert!(stdout.contains("ping -> listener 2: {\"n\":1}"));
}

#[test]
fn connect_prints_stored_token() {
    let output = frau(&["--format", "json", "connect", "--token", "s3cret"]);
    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be JSON");
    assert_eq!(report["token"], "s3cret");
    assert_eq!(report["storage_key"], "XSRF.Token@https://host.frau.local");
    assert_eq!(report["reported_height"], 480);
}

#[test]
fn zero_duration_exits_64() {
    let output = frau(&["event", "ping", "--timeout", "0s"]);
    assert_eq!(output.status.code(), Some(64));
}
