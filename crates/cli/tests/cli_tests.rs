//! CLI integration tests

use std::process::Command;

fn streamctl(args: &[&str]) -> std::process::Output {
    Command::new("cargo")
        .args(["run", "-q", "-p", "streamctl", "--"])
        .args(args)
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = streamctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Stream Anomaly Detector"),
        "Should show app name"
    );
    assert!(stdout.contains("generate"), "Should show generate command");
    assert!(stdout.contains("scan"), "Should show scan command");
    assert!(stdout.contains("watch"), "Should show watch command");
    assert!(stdout.contains("status"), "Should show status command");
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = streamctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("streamctl"), "Should show binary name");
}

#[test]
fn test_generate_help() {
    let output = streamctl(&["generate", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Generate help should succeed");
    assert!(stdout.contains("--output"), "Should show output option");
    assert!(stdout.contains("--seed"), "Should show seed option");
    assert!(
        stdout.contains("--anomaly-chance"),
        "Should show stream shape options"
    );
}

#[test]
fn test_scan_help() {
    let output = streamctl(&["scan", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Scan help should succeed");
    assert!(stdout.contains("--window-size"), "Should show window option");
    assert!(stdout.contains("--tolerance"), "Should show tolerance option");
    assert!(
        stdout.contains("--variance-mode"),
        "Should show variance mode option"
    );
}

#[test]
fn test_watch_help() {
    let output = streamctl(&["watch", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "Watch help should succeed");
    assert!(stdout.contains("--once"), "Should show once option");
    assert!(stdout.contains("--points"), "Should show points option");
}

#[test]
fn test_scan_reports_anomalies_as_json() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let data = temp_dir.path().join("data.txt");
    std::fs::write(&data, "1,10,\n2,10,\n3,10,\n4,100,\n5,10,\n").unwrap();

    let output = streamctl(&[
        "--format",
        "json",
        "scan",
        data.to_str().unwrap(),
        "--window-size",
        "3",
        "--tolerance",
        "1",
    ]);

    assert!(output.status.success(), "Scan should succeed");

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["readings"], 5);
    assert_eq!(report["anomalies"][0]["timestamp"], 4);
    assert_eq!(report["anomalies"].as_array().unwrap().len(), 1);
}

#[test]
fn test_invalid_window_size_fails() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let data = temp_dir.path().join("data.txt");
    std::fs::write(&data, "1,10,\n").unwrap();

    let output = streamctl(&["scan", data.to_str().unwrap(), "--window-size", "1"]);

    assert!(!output.status.success(), "Window size 1 should be rejected");
}

#[test]
fn test_invalid_command() {
    let output = streamctl(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");
}
