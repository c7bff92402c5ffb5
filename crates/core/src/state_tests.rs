// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle state serialization tests

use super::*;
use yare::parameterized;

#[parameterized(
    not_started = { AdaptorState::NotStarted, "\"not_started\"" },
    start = { AdaptorState::Start, "\"start\"" },
    run = { AdaptorState::Run, "\"run\"" },
    stop = { AdaptorState::Stop, "\"stop\"" },
    cleanup = { AdaptorState::Cleanup, "\"cleanup\"" },
    canceled = { AdaptorState::Canceled, "\"canceled\"" },
)]
fn state_serializes_snake_case(state: AdaptorState, expected: &str) {
    let json = serde_json::to_string(&state).unwrap();
    assert_eq!(json, expected);

    let back: AdaptorState = serde_json::from_str(expected).unwrap();
    assert_eq!(back, state);
}

#[test]
fn status_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&AdaptorStatus::Idle).unwrap(), "\"idle\"");
    assert_eq!(
        serde_json::to_string(&AdaptorStatus::Working).unwrap(),
        "\"working\""
    );
}

#[parameterized(
    start = { AdaptorState::Start, true },
    run = { AdaptorState::Run, true },
    not_started = { AdaptorState::NotStarted, false },
    stop = { AdaptorState::Stop, false },
    cleanup = { AdaptorState::Cleanup, false },
    canceled = { AdaptorState::Canceled, false },
)]
fn cancelable_only_during_start_and_run(state: AdaptorState, expected: bool) {
    assert_eq!(state.is_cancelable(), expected);
}

#[test]
fn display_matches_wire_form() {
    assert_eq!(AdaptorState::NotStarted.to_string(), "not_started");
    assert_eq!(AdaptorState::Canceled.to_string(), "canceled");
}
