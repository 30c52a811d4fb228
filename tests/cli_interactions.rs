//! CLI options interaction tests
//!
//! Run the `amt` binary against temporary configurations and local emulators.

use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::process::Command;
use std::thread;
use tempfile::TempDir;

const ENV_VARS: &[&str] = &[
    "AMMETER_CONFIG",
    "SAMPLING_FREQUENCY_HZ",
    "MEASUREMENTS_COUNT",
    "RESULTS_SAVE_PATH",
    "ENABLE_COLOR",
    "NO_COLOR",
    "FORCE_COLOR",
];

/// Command isolated from the caller's environment, running inside `dir`
fn create_test_cmd(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("amt").unwrap();
    cmd.current_dir(dir.path());
    for var in ENV_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Write a configuration naming the given devices on localhost
fn write_config(dir: &TempDir, devices: &[(&str, u16)]) -> String {
    let ammeters: Vec<String> = devices
        .iter()
        .map(|(name, port)| format!(r#""{}": {{ "port": {}, "command": "MEASURE_{}" }}"#, name, port, name.to_uppercase()))
        .collect();
    let content = format!(
        r#"{{
  "ammeters": {{ {} }},
  "testing": {{ "sampling": {{ "sampling_frequency_hz": 50, "measurements_count": 5, "total_duration_seconds": 0.1, "request_timeout_ms": 500 }} }},
  "analysis": {{ "statistical_metrics": ["mean", "median", "std_dev", "min", "max"], "visualization": {{ "enabled": false }} }},
  "result_management": {{ "save_path": "results" }}
}}"#,
        ammeters.join(", ")
    );
    let path = dir.path().join("bench.json");
    fs::write(&path, content).unwrap();
    path.to_string_lossy().into_owned()
}

/// Blocking emulator answering every connection with the next reading
fn spawn_emulator(readings: &'static [&'static str]) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    thread::spawn(move || {
        for (tick, stream) in listener.incoming().enumerate() {
            let Ok(mut stream) = stream else { continue };
            let mut buffer = [0u8; 256];
            let _ = stream.read(&mut buffer);
            let _ = stream.write_all(readings[tick % readings.len()].as_bytes());
        }
    });
    port
}

#[test]
fn test_help_lists_options() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--device"))
        .stdout(predicate::str::contains("--count"))
        .stdout(predicate::str::contains("--frequency"));
}

#[test]
fn test_version() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_invalid_count_rejected() {
    let dir = TempDir::new().unwrap();
    for count in ["0", "-3", "abc"] {
        create_test_cmd(&dir).args(["--count", count]).assert().failure();
    }
}

#[test]
fn test_invalid_frequency_rejected() {
    let dir = TempDir::new().unwrap();
    for frequency in ["0", "-1", "nan", "1e-20"] {
        create_test_cmd(&dir).args(["--frequency", frequency]).assert().failure();
    }
}

#[test]
fn test_help_env_lists_variables() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .arg("--help-env")
        .assert()
        .success()
        .stdout(predicate::str::contains("SAMPLING_FREQUENCY_HZ"))
        .stdout(predicate::str::contains("Configuration Priority"))
        .stdout(predicate::str::contains("# RESULTS_SAVE_PATH=results"));
}

#[test]
fn test_invalid_environment_values_rejected() {
    let dir = TempDir::new().unwrap();
    let cases = [
        ("MEASUREMENTS_COUNT", "0", "MEASUREMENTS_COUNT must be greater than 0"),
        ("SAMPLING_FREQUENCY_HZ", "1e-20", "too low to schedule"),
        ("RESULTS_SAVE_PATH", "   ", "RESULTS_SAVE_PATH cannot be empty"),
        ("ENABLE_COLOR", "maybe", "Invalid ENABLE_COLOR value"),
    ];
    for (name, value, message) in cases {
        create_test_cmd(&dir)
            .arg("--list-devices")
            .env(name, value)
            .assert()
            .code(1)
            .stderr(predicate::str::contains(message));
    }
}

#[test]
fn test_dotenv_values_are_validated() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join(".env"), "MEASUREMENTS_COUNT=0\n").unwrap();
    create_test_cmd(&dir)
        .arg("--list-devices")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("MEASUREMENTS_COUNT must be greater than 0"));
}

#[test]
fn test_conflicting_color_flags() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--color", "--no-color"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot specify both"));
}

#[test]
fn test_list_devices_from_config_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &[("greenlee", 5000), ("entes", 5001)]);

    create_test_cmd(&dir)
        .args(["--list-devices", "--config", &config])
        .assert()
        .success()
        .stdout(predicate::str::contains("greenlee"))
        .stdout(predicate::str::contains("127.0.0.1:5001"))
        .stdout(predicate::str::contains("MEASURE_ENTES"));
}

#[test]
fn test_list_devices_uses_defaults_without_config_file() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--list-devices", "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("circutor"));
}

#[test]
fn test_missing_config_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    create_test_cmd(&dir)
        .args(["--config", "does-not-exist.json", "--no-color"])
        .assert()
        .code(1);
}

#[test]
fn test_unknown_device_fails() {
    let dir = TempDir::new().unwrap();
    let config = write_config(&dir, &[("greenlee", 5000)]);

    create_test_cmd(&dir)
        .args(["--config", &config, "--device", "fluke", "--no-save", "--no-color"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not found in configuration"));
}

#[test]
fn test_two_emulated_devices_compared() {
    let dir = TempDir::new().unwrap();
    let steady = spawn_emulator(&["1.00", "1.01"]);
    let noisy = spawn_emulator(&["0.5", "1.5"]);
    let config = write_config(&dir, &[("greenlee", noisy), ("entes", steady)]);

    create_test_cmd(&dir)
        .args(["--config", &config, "--no-color"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Device Comparison"))
        .stdout(predicate::str::contains("entes"));

    assert!(dir.path().join("results").join("archive").join("entes").is_dir());
}

#[test]
fn test_single_device_skips_comparison() {
    let dir = TempDir::new().unwrap();
    let port = spawn_emulator(&["2.0"]);
    let config = write_config(&dir, &[("greenlee", port)]);

    create_test_cmd(&dir)
        .args(["--config", &config, "--no-color", "--no-save"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Device Comparison").not());

    assert!(!dir.path().join("results").exists());
}
