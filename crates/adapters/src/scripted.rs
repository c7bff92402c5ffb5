// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted adaptor for tests.

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::info;

use adaptor_core::{Adaptor, AdaptorError, RunData};

/// Test adaptor with scripted behavior.
///
/// Records every callback invocation, optionally logs lines, sleeps, or
/// fails on run. A sleeping run observes `on_cancel` and returns promptly,
/// the way real adaptors are expected to behave.
#[derive(Default)]
pub struct ScriptedAdaptor {
    run_delay: Option<Duration>,
    fail_on_run: Option<String>,
    log_on_run: Vec<String>,
    calls: Mutex<Vec<String>>,
    cancel: CancellationToken,
}

impl ScriptedAdaptor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside `on_run` (interruptible by cancel).
    pub fn with_run_delay(mut self, delay: Duration) -> Self {
        self.run_delay = Some(delay);
        self
    }

    /// Fail `on_run` with this message.
    pub fn with_run_failure(mut self, message: &str) -> Self {
        self.fail_on_run = Some(message.to_string());
        self
    }

    /// Log these lines at info level inside `on_run`.
    pub fn with_run_log_lines(mut self, lines: &[&str]) -> Self {
        self.log_on_run = lines.iter().map(|s| s.to_string()).collect();
        self
    }

    /// The callbacks invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, name: &str) {
        self.calls.lock().push(name.to_string());
    }
}

#[async_trait]
impl Adaptor for ScriptedAdaptor {
    async fn on_start(&self) -> Result<(), AdaptorError> {
        self.record("start");
        Ok(())
    }

    async fn on_run(&self, _run_data: &RunData) -> Result<(), AdaptorError> {
        self.record("run");

        for line in &self.log_on_run {
            info!("{line}");
        }

        if let Some(delay) = self.run_delay {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.cancel.cancelled() => return Ok(()),
            }
        }

        match &self.fail_on_run {
            Some(message) => Err(AdaptorError::Failed(message.clone())),
            None => Ok(()),
        }
    }

    async fn on_stop(&self) -> Result<(), AdaptorError> {
        self.record("stop");
        Ok(())
    }

    async fn on_cleanup(&self) -> Result<(), AdaptorError> {
        self.record("cleanup");
        Ok(())
    }

    async fn on_cancel(&self) -> Result<(), AdaptorError> {
        self.record("cancel");
        self.cancel.cancel();
        Ok(())
    }
}
