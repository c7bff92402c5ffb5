//! Daemon mode specs: the full frontend/backend lifecycle over IPC.

use crate::prelude::*;

fn start_echo_backend(harness: &Harness) {
    harness
        .runtime()
        .args(&[
            "daemon",
            "start",
            "--init-data",
            r#"{"executable": "echo", "arguments": ["task"]}"#,
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .passes();
    assert!(harness.connection_file().exists());
}

fn stop_backend(harness: &Harness) {
    harness
        .runtime()
        .args(&[
            "daemon",
            "stop",
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .passes();
    harness.wait_until_gone(&harness.connection_file());
}

#[test]
fn start_run_stop_happy_path() {
    let harness = Harness::new();
    start_echo_backend(&harness);

    let stdout = harness
        .runtime()
        .args(&[
            "daemon",
            "run",
            "--run-data",
            r#"{"arguments": ["frame-1"]}"#,
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .passes();
    assert!(stdout.contains("task frame-1"), "got: {stdout}");

    stop_backend(&harness);
}

#[test]
fn run_twice_completes_both_tasks() {
    let harness = Harness::new();
    start_echo_backend(&harness);

    for frame in ["frame-1", "frame-2"] {
        let stdout = harness
            .runtime()
            .args(&[
                "daemon",
                "run",
                "--run-data",
                &format!(r#"{{"arguments": ["{frame}"]}}"#),
                "--connection-file",
                &harness.connection_file_arg(),
            ])
            .passes();
        assert!(stdout.contains(&format!("task {frame}")), "got: {stdout}");
    }

    stop_backend(&harness);
}

#[test]
fn start_refuses_an_existing_connection_file() {
    let harness = Harness::new();
    std::fs::write(harness.connection_file(), "{}").unwrap();

    let output = harness
        .runtime()
        .args(&[
            "daemon",
            "start",
            "--init-data",
            r#"{"executable": "echo"}"#,
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .fails();
    assert!(
        output.contains("existing connection file"),
        "got: {output}"
    );

    // Clean up the decoy so the harness drop doesn't try to stop a backend
    std::fs::remove_file(harness.connection_file()).unwrap();
}

#[test]
fn failed_run_surfaces_the_failure_and_leaves_the_backend_usable() {
    let harness = Harness::new();
    harness
        .runtime()
        .args(&[
            "daemon",
            "start",
            "--init-data",
            r#"{"executable": "false"}"#,
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .passes();

    let output = harness
        .runtime()
        .args(&[
            "daemon",
            "run",
            "--run-data",
            "{}",
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .fails();
    assert!(output.contains("openjd_fail: "), "got: {output}");

    // The backend is still serving: stop tears it down cleanly
    stop_backend(&harness);
}

#[test]
fn stop_removes_the_rendezvous_artifacts() {
    let harness = Harness::new();
    start_echo_backend(&harness);

    let settings: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(harness.connection_file()).unwrap())
            .unwrap();
    let endpoint = std::path::PathBuf::from(settings["endpoint"].as_str().unwrap());
    assert!(endpoint.exists(), "socket missing at {}", endpoint.display());

    stop_backend(&harness);
    harness.wait_until_gone(&endpoint);
}

#[test]
fn run_against_a_missing_backend_fails() {
    let harness = Harness::new();

    let output = harness
        .runtime()
        .args(&[
            "daemon",
            "run",
            "--run-data",
            "{}",
            "--connection-file",
            &harness.connection_file_arg(),
        ])
        .fails();
    assert!(output.contains("connection file"), "got: {output}");
}
