// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runner state machine tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use super::*;

/// Adaptor that records how many times each callback ran and can be
/// configured to fail a specific callback.
#[derive(Default)]
struct RecordingAdaptor {
    starts: AtomicUsize,
    runs: AtomicUsize,
    stops: AtomicUsize,
    cleanups: AtomicUsize,
    cancels: AtomicUsize,
    fail_on_run: bool,
}

#[async_trait]
impl Adaptor for RecordingAdaptor {
    async fn on_start(&self) -> Result<(), AdaptorError> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_run(&self, _run_data: &RunData) -> Result<(), AdaptorError> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if self.fail_on_run {
            return Err(AdaptorError::Failed("bad input".to_string()));
        }
        Ok(())
    }

    async fn on_stop(&self) -> Result<(), AdaptorError> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_cleanup(&self) -> Result<(), AdaptorError> {
        self.cleanups.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn on_cancel(&self) -> Result<(), AdaptorError> {
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn full_lifecycle_transitions_in_order() {
    let adaptor = Arc::new(RecordingAdaptor::default());
    let runner = AdaptorRunner::new(adaptor.clone());

    assert_eq!(runner.state(), AdaptorState::NotStarted);

    runner.start().await.unwrap();
    assert_eq!(runner.state(), AdaptorState::Start);

    runner.run(&RunData::new()).await.unwrap();
    assert_eq!(runner.state(), AdaptorState::Run);

    runner.run(&RunData::new()).await.unwrap();
    assert_eq!(runner.state(), AdaptorState::Run);

    runner.stop().await.unwrap();
    assert_eq!(runner.state(), AdaptorState::Stop);

    runner.cleanup().await.unwrap();
    assert_eq!(runner.state(), AdaptorState::Cleanup);

    assert_eq!(adaptor.starts.load(Ordering::SeqCst), 1);
    assert_eq!(adaptor.runs.load(Ordering::SeqCst), 2);
    assert_eq!(adaptor.stops.load(Ordering::SeqCst), 1);
    assert_eq!(adaptor.cleanups.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn state_transitions_before_dispatch_and_survives_failure() {
    let adaptor = Arc::new(RecordingAdaptor {
        fail_on_run: true,
        ..Default::default()
    });
    let runner = AdaptorRunner::new(adaptor);

    let err = runner.run(&RunData::new()).await.unwrap_err();
    assert!(matches!(err, AdaptorError::Failed(_)));

    // The state keeps the value set on entry even though the callback failed
    assert_eq!(runner.state(), AdaptorState::Run);
}

#[tokio::test]
async fn cancel_reaches_canceled_from_any_state() {
    let adaptor = Arc::new(RecordingAdaptor::default());
    let runner = AdaptorRunner::new(adaptor.clone());

    runner.cancel().await.unwrap();
    assert_eq!(runner.state(), AdaptorState::Canceled);
    assert_eq!(adaptor.cancels.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn runner_clones_share_state() {
    let runner = AdaptorRunner::new(Arc::new(RecordingAdaptor::default()));
    let clone = runner.clone();

    runner.start().await.unwrap();
    assert_eq!(clone.state(), AdaptorState::Start);
}
