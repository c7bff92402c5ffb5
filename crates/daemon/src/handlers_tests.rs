// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router and endpoint handler tests

use std::sync::Arc;
use std::time::Duration;

use adaptor_adapters::ScriptedAdaptor;
use adaptor_core::{AdaptorState, AdaptorStatus};
use crate::log_buffer::InMemoryLogBuffer;

use super::*;

fn ctx_with(adaptor: ScriptedAdaptor) -> (ServeCtx, Arc<InMemoryLogBuffer>) {
    let buffer = Arc::new(InMemoryLogBuffer::new());
    let ctx = ServeCtx {
        runner: AdaptorRunner::new(Arc::new(adaptor)),
        buffer: Some(Arc::clone(&buffer) as Arc<dyn LogBuffer>),
        worker: FutureRunner::new(),
        shutdown: Arc::new(Notify::new()),
    };
    (ctx, buffer)
}

fn request(method: &str, path: &str) -> IncomingRequest {
    IncomingRequest {
        method: method.to_string(),
        path: path.to_string(),
        params: Vec::new(),
        body: Vec::new(),
    }
}

fn heartbeat_request(ack_id: Option<&str>) -> IncomingRequest {
    let mut req = request("GET", "/heartbeat");
    if let Some(id) = ack_id {
        req.params.push(("ack_id".to_string(), id.to_string()));
    }
    req
}

async fn wait_until_idle(ctx: &ServeCtx) {
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while ctx.worker.is_running() {
        assert!(std::time::Instant::now() < deadline, "worker never went idle");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

fn parse_heartbeat(resp: &HttpResponse) -> HeartbeatResponse {
    assert_eq!(resp.status, 200, "body: {}", resp.body);
    serde_json::from_str(&resp.body).expect("heartbeat body")
}

#[tokio::test]
async fn unknown_path_is_404() {
    let (ctx, _) = ctx_with(ScriptedAdaptor::new());
    let resp = route(&ctx, request("GET", "/nope")).await;
    assert_eq!(resp.status, 404);
}

#[tokio::test]
async fn wrong_verb_on_known_path_is_405() {
    let (ctx, _) = ctx_with(ScriptedAdaptor::new());
    assert_eq!(route(&ctx, request("GET", "/start")).await.status, 405);
    assert_eq!(route(&ctx, request("PUT", "/heartbeat")).await.status, 405);
}

#[tokio::test]
async fn start_submits_and_reports_working_until_done() {
    let adaptor = ScriptedAdaptor::new().with_run_delay(Duration::from_millis(100));
    let (ctx, _) = ctx_with(adaptor);

    let resp = route(&ctx, request("PUT", "/start")).await;
    assert_eq!(resp.status, 200);

    wait_until_idle(&ctx).await;
    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(heartbeat.state, AdaptorState::Start);
    assert_eq!(heartbeat.status, AdaptorStatus::Idle);
}

#[tokio::test]
async fn run_while_worker_busy_is_400_and_state_unchanged() {
    let adaptor = ScriptedAdaptor::new().with_run_delay(Duration::from_secs(5));
    let (ctx, _) = ctx_with(adaptor);

    let mut run_req = request("PUT", "/run");
    run_req.body = br#"{"frame": 1}"#.to_vec();
    assert_eq!(route(&ctx, run_req).await.status, 200);

    // Guaranteed by the work-submission invariant: the task has started
    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(heartbeat.status, AdaptorStatus::Working);

    let resp = route(&ctx, request("PUT", "/run")).await;
    assert_eq!(resp.status, 400);

    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(heartbeat.state, AdaptorState::Run);
}

#[tokio::test]
async fn malformed_run_data_is_500() {
    let (ctx, _) = ctx_with(ScriptedAdaptor::new());

    let mut req = request("PUT", "/run");
    req.body = b"not json".to_vec();
    let resp = route(&ctx, req).await;
    assert_eq!(resp.status, 500);
    assert!(resp.body.contains("run data"), "body: {}", resp.body);
}

#[tokio::test]
async fn stop_runs_stop_then_cleanup() {
    let adaptor = ScriptedAdaptor::new();
    let (ctx, _) = ctx_with(adaptor);

    assert_eq!(route(&ctx, request("PUT", "/stop")).await.status, 200);
    wait_until_idle(&ctx).await;

    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    // The stop wrapper advances through cleanup
    assert_eq!(heartbeat.state, AdaptorState::Cleanup);
}

#[tokio::test]
async fn cancel_while_idle_requires_no_action() {
    let (ctx, _) = ctx_with(ScriptedAdaptor::new());

    let resp = route(&ctx, request("PUT", "/cancel")).await;
    assert_eq!(resp.status, 200);
    assert_eq!(resp.body, "No action required");
    assert_eq!(
        parse_heartbeat(&route(&ctx, heartbeat_request(None)).await).state,
        AdaptorState::NotStarted
    );
}

#[tokio::test]
async fn cancel_interrupts_a_running_task() {
    let adaptor = ScriptedAdaptor::new().with_run_delay(Duration::from_secs(30));
    let (ctx, _) = ctx_with(adaptor);

    assert_eq!(route(&ctx, request("PUT", "/run")).await.status, 200);
    let resp = route(&ctx, request("PUT", "/cancel")).await;
    assert_eq!(resp.status, 200);
    assert_ne!(resp.body, "No action required");

    wait_until_idle(&ctx).await;
    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(heartbeat.state, AdaptorState::Canceled);
    assert_eq!(heartbeat.status, AdaptorStatus::Idle);
}

#[tokio::test]
async fn cancel_after_stop_requires_no_action() {
    let (ctx, _) = ctx_with(ScriptedAdaptor::new());

    assert_eq!(route(&ctx, request("PUT", "/stop")).await.status, 200);
    wait_until_idle(&ctx).await;

    let resp = route(&ctx, request("PUT", "/cancel")).await;
    assert_eq!(resp.body, "No action required");
}

#[tokio::test]
async fn heartbeat_drains_and_acks_chunks() {
    let (ctx, buffer) = ctx_with(ScriptedAdaptor::new());
    buffer.buffer("A");
    buffer.buffer("B");

    let first = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(first.output.output, "A\nB");

    // Unacked output is retained
    let second = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(second.output.output, "A\nB");

    // ACK drops it
    let third = parse_heartbeat(&route(&ctx, heartbeat_request(Some(&second.output.id))).await);
    assert_eq!(third.output.output, "");
}

#[tokio::test]
async fn heartbeat_reports_failure_sentinel() {
    let adaptor = ScriptedAdaptor::new().with_run_failure("bad input");
    let (ctx, buffer) = ctx_with(adaptor);
    assert_eq!(route(&ctx, request("PUT", "/run")).await.status, 200);
    wait_until_idle(&ctx).await;

    // The runner's failure line lands in the buffer the way the logging
    // layer would format it
    buffer.buffer("ERROR: openjd_fail: Error encountered while running adaptor: bad input");

    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert!(heartbeat.failed);
    assert!(heartbeat.output.output.contains("bad input"));
}

#[tokio::test]
async fn heartbeat_without_buffer_returns_empty_sentinel() {
    let ctx = ServeCtx {
        runner: AdaptorRunner::new(Arc::new(ScriptedAdaptor::new())),
        buffer: None,
        worker: FutureRunner::new(),
        shutdown: Arc::new(Notify::new()),
    };

    let heartbeat = parse_heartbeat(&route(&ctx, heartbeat_request(None)).await);
    assert_eq!(heartbeat.output.id, "EMPTY");
    assert!(!heartbeat.failed);
}

#[tokio::test]
async fn shutdown_sets_the_event() {
    let (ctx, _) = ctx_with(ScriptedAdaptor::new());

    let resp = route(&ctx, request("PUT", "/shutdown")).await;
    assert_eq!(resp.status, 200);

    tokio::time::timeout(Duration::from_millis(100), ctx.shutdown.notified())
        .await
        .expect("shutdown event was not set");
}

#[test]
fn envelope_converts_with_params() {
    let envelope = RequestEnvelope {
        method: "GET".to_string(),
        path: "/heartbeat".to_string(),
        body: None,
        params: Some(r#"{"ack_id": "123.000001"}"#.to_string()),
    };

    let req = IncomingRequest::from_envelope(envelope).unwrap();
    assert_eq!(req.param("ack_id"), Some("123.000001"));
}
