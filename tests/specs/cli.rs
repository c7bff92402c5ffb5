//! CLI surface specs: help, argument errors, configuration printing.

use crate::prelude::*;

#[test]
fn no_subcommand_prints_help_and_exits_2() {
    let harness = Harness::new();
    assert_eq!(harness.runtime().exit_code(), 2);
}

#[test]
fn unknown_subcommand_is_an_argument_error() {
    let harness = Harness::new();
    assert_eq!(harness.runtime().args(&["frobnicate"]).exit_code(), 2);
}

#[test]
fn malformed_init_data_is_an_argument_error() {
    let harness = Harness::new();
    let code = harness
        .runtime()
        .args(&["run", "--init-data", "{not json"])
        .exit_code();
    assert_eq!(code, 2);
}

#[test]
fn show_config_prints_the_runtime_configuration() {
    let harness = Harness::new();
    let stdout = harness.runtime().args(&["--show-config"]).passes();
    assert!(stdout.contains("log_level"), "got: {stdout}");
    assert!(stdout.contains("INFO"), "got: {stdout}");
}

#[test]
fn show_config_reflects_user_configuration() {
    let harness = Harness::new();
    harness.write_user_config(r#"{"log_level": "DEBUG"}"#);

    let stdout = harness.runtime().args(&["--show-config"]).passes();
    assert!(stdout.contains("DEBUG"), "got: {stdout}");
}

#[test]
fn nonvalid_user_configuration_is_fatal() {
    let harness = Harness::new();
    harness.write_user_config("{broken");

    let output = harness.runtime().args(&["--show-config"]).fails();
    assert!(output.contains("configuration"), "got: {output}");
}

#[test]
fn help_mentions_both_modes() {
    let harness = Harness::new();
    let stdout = harness.runtime().args(&["--help"]).passes();
    assert!(stdout.contains("run"), "got: {stdout}");
    assert!(stdout.contains("daemon"), "got: {stdout}");
}
