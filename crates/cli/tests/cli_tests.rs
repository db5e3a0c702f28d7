//! CLI integration tests

use std::process::{Command, Output};

fn ignctl(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ignctl"))
        .args(args)
        .env_remove("IGNITION_API_URL")
        .output()
        .expect("Failed to execute command")
}

/// Test that the CLI shows help
#[test]
fn test_cli_help() {
    let output = ignctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI help should succeed");
    assert!(
        stdout.contains("Stockpile Ignition Forecast"),
        "Should show app name"
    );
    for command in ["upload", "forecast", "predict", "piles", "age", "weather", "reload-model"] {
        assert!(stdout.contains(command), "Should show {} command", command);
    }
}

/// Test that the CLI shows version
#[test]
fn test_cli_version() {
    let output = ignctl(&["--version"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "CLI version should succeed");
    assert!(stdout.contains("ignctl"), "Should show binary name");
}

#[test]
fn test_upload_help() {
    let output = ignctl(&["upload", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--kind"), "Should show kind option");
    assert!(stdout.contains("<FILE>"), "Should show file argument");
}

#[test]
fn test_forecast_help() {
    let output = ignctl(&["forecast", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--days"));
    assert!(stdout.contains("--start"));
    assert!(stdout.contains("--end"));
}

#[test]
fn test_forecast_days_conflicts_with_window() {
    let output = ignctl(&["forecast", "--days", "3", "--start", "2025-11-21", "--end", "2025-11-25"]);

    assert!(!output.status.success(), "Conflicting window options should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_forecast_start_requires_end() {
    let output = ignctl(&["forecast", "--start", "2025-11-21"]);

    assert!(!output.status.success(), "Half-open window should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--end"));
}

#[test]
fn test_predict_help() {
    let output = ignctl(&["predict", "--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success());
    assert!(stdout.contains("--input"));
    assert!(stdout.contains("--date"));
}

#[test]
fn test_weather_pile_requires_warehouse() {
    let output = ignctl(&[
        "weather", "--start", "2025-11-01", "--end", "2025-11-20", "--pile", "46",
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--warehouse"));
}

/// Test format option
#[test]
fn test_format_option() {
    let output = ignctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--format"), "Should show format option");
    assert!(stdout.contains("table"), "Should show table format");
    assert!(stdout.contains("json"), "Should show json format");
}

/// Test api-url option
#[test]
fn test_api_url_option() {
    let output = ignctl(&["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("--api-url"), "Should show api-url option");
    assert!(stdout.contains("IGNITION_API_URL"), "Should show env var");
}

/// Test invalid command error handling
#[test]
fn test_invalid_command() {
    let output = ignctl(&["invalid-command"]);

    assert!(!output.status.success(), "Invalid command should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("error") || stderr.contains("invalid"),
        "Should show error message"
    );
}

/// Test missing required argument error handling
#[test]
fn test_missing_argument() {
    let output = ignctl(&["age", "--warehouse", "4"]);

    assert!(!output.status.success(), "Missing argument should fail");

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("required") || stderr.contains("error"),
        "Should show error about missing argument"
    );
}

#[test]
fn test_unreachable_server_fails_cleanly() {
    let output = ignctl(&["--api-url", "http://127.0.0.1:9", "piles"]);

    assert!(!output.status.success(), "Unreachable server should fail");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to send request"));
}
