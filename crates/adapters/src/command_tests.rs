// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Command adaptor tests

use adaptor_core::Adaptor;

use super::*;

fn init_data(json: &str) -> InitData {
    serde_json::from_str(json).unwrap()
}

fn run_data(json: &str) -> RunData {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn run_spawns_executable_with_merged_arguments() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("ran");

    let adaptor = CommandAdaptor::new(
        &init_data(&format!(
            r#"{{"executable": "touch", "arguments": ["{}"]}}"#,
            marker.display()
        )),
        Vec::new(),
    )
    .unwrap();

    adaptor.on_run(&run_data("{}")).await.unwrap();
    assert!(marker.exists());
}

#[tokio::test]
async fn run_data_arguments_are_appended() {
    let dir = tempfile::tempdir().unwrap();
    let marker = dir.path().join("from-run-data");

    let adaptor = CommandAdaptor::new(&init_data(r#"{"executable": "touch"}"#), Vec::new()).unwrap();

    adaptor
        .on_run(&run_data(&format!(
            r#"{{"arguments": ["{}"]}}"#,
            marker.display()
        )))
        .await
        .unwrap();
    assert!(marker.exists());
}

#[tokio::test]
async fn failing_command_is_an_adaptor_failure() {
    let adaptor = CommandAdaptor::new(&init_data(r#"{"executable": "false"}"#), Vec::new()).unwrap();

    let err = adaptor.on_run(&run_data("{}")).await.unwrap_err();
    assert!(err.to_string().contains("exited"), "got: {err}");
}

#[tokio::test]
async fn missing_executable_field_is_rejected() {
    let err = CommandAdaptor::new(&init_data("{}"), Vec::new()).unwrap_err();
    assert!(err.to_string().contains("executable"), "got: {err}");
}

#[tokio::test]
async fn non_string_arguments_are_rejected() {
    let err = CommandAdaptor::new(
        &init_data(r#"{"executable": "echo", "arguments": [1, 2]}"#),
        Vec::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("arguments"), "got: {err}");
}

#[tokio::test]
async fn cancel_interrupts_a_running_command() {
    let adaptor = std::sync::Arc::new(
        CommandAdaptor::new(
            &init_data(r#"{"executable": "sleep", "arguments": ["30"]}"#),
            Vec::new(),
        )
        .unwrap(),
    );

    let runner = {
        let adaptor = adaptor.clone();
        tokio::spawn(async move { adaptor.on_run(&RunData::new()).await })
    };

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    adaptor.on_cancel().await.unwrap();

    // A canceled run resolves cleanly; the cancel worker owns the state change
    tokio::time::timeout(std::time::Duration::from_secs(5), runner)
        .await
        .expect("cancel did not take effect")
        .unwrap()
        .unwrap();
}

#[test]
fn path_mapping_rules_apply() {
    let rules = vec![PathMappingRule {
        source_path_format: "POSIX".to_string(),
        source_path: "/mnt".to_string(),
        destination_path: "/local".to_string(),
    }];
    let adaptor =
        CommandAdaptor::new(&init_data(r#"{"executable": "echo"}"#), rules).unwrap();

    assert_eq!(adaptor.map_path("/mnt/scene.ma"), "/local/scene.ma");
}
