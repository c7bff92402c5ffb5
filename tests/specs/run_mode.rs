//! Foreground (`run`) mode specs.

use crate::prelude::*;

#[test]
fn happy_path_runs_the_command_and_relays_output() {
    let harness = Harness::new();

    let stdout = harness
        .runtime()
        .args(&[
            "run",
            "--init-data",
            r#"{"executable": "echo", "arguments": ["hello"]}"#,
            "--run-data",
            r#"{"arguments": ["world"]}"#,
        ])
        .passes();

    assert!(stdout.contains("hello world"), "got: {stdout}");
}

#[test]
fn failing_command_exits_nonzero_with_the_failure_sentinel() {
    let harness = Harness::new();

    let output = harness
        .runtime()
        .args(&["run", "--init-data", r#"{"executable": "false"}"#])
        .fails();

    assert!(output.contains("openjd_fail: "), "got: {output}");
    assert!(
        output.contains("Error encountered while running adaptor"),
        "got: {output}"
    );
}

#[test]
fn missing_executable_field_is_an_adaptor_failure() {
    let harness = Harness::new();

    let output = harness.runtime().args(&["run"]).fails();
    assert!(output.contains("executable"), "got: {output}");
}

#[test]
fn init_data_can_come_from_a_file() {
    let harness = Harness::new();
    let init_path = harness.home().join("init.json");
    std::fs::write(
        &init_path,
        r#"{"executable": "echo", "arguments": ["from-file"]}"#,
    )
    .unwrap();

    let stdout = harness
        .runtime()
        .args(&["run", "--init-data", &format!("file://{}", init_path.display())])
        .passes();

    assert!(stdout.contains("from-file"), "got: {stdout}");
}
