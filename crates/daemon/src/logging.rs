// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log formatting and routing for both runtime modes.
//!
//! Every event renders as `LEVEL: message`, except sentinel lines
//! (`openjd_*: ...`) which pass through untouched so outer job runners can
//! parse them. Foreground mode writes to stdout; daemon mode writes into
//! the log buffer, which the frontend drains over heartbeats; stdout is
//! deliberately silent there.

use std::io::Write;
use std::sync::Arc;

use thiserror::Error;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use adaptor_core::sentinels::OPENJD_LOG_PATTERN;

use crate::log_buffer::LogBuffer;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to initialize logging: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

enum LogSink {
    Stdout,
    Buffer(Arc<dyn LogBuffer>),
}

/// Layer rendering events in the runtime's line format.
pub struct AdaptorLogLayer {
    sink: LogSink,
}

impl AdaptorLogLayer {
    /// Foreground mode: formatted lines to stdout.
    pub fn stdout() -> Self {
        Self {
            sink: LogSink::Stdout,
        }
    }

    /// Daemon mode: formatted lines into the log buffer.
    pub fn buffered(buffer: Arc<dyn LogBuffer>) -> Self {
        Self {
            sink: LogSink::Buffer(buffer),
        }
    }

    fn emit(&self, line: &str) {
        match &self.sink {
            LogSink::Stdout => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{line}");
                let _ = stdout.flush();
            }
            LogSink::Buffer(buffer) => buffer.buffer(line),
        }
    }
}

impl<S: Subscriber> Layer<S> for AdaptorLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut message = String::new();
        event.record(&mut MessageVisitor(&mut message));
        self.emit(&format_line(*event.metadata().level(), &message));
    }
}

/// Render one event line: raw for sentinels, `LEVEL: message` otherwise.
pub fn format_line(level: Level, message: &str) -> String {
    if OPENJD_LOG_PATTERN.is_match(message) {
        message.to_string()
    } else {
        format!("{level}: {message}")
    }
}

/// Install the layer as the global subscriber at the given level.
pub fn init_logging(layer: AdaptorLogLayer, log_level: &str) -> Result<(), LoggingError> {
    let filtered = Layer::with_filter(layer, level_filter(log_level));
    tracing_subscriber::registry().with(filtered).try_init()?;
    Ok(())
}

/// Map a configuration log level name to a filter. Unknown names (already
/// rejected by config validation) fall back to INFO.
pub fn level_filter(log_level: &str) -> LevelFilter {
    match log_level.to_uppercase().as_str() {
        "ERROR" => LevelFilter::ERROR,
        "WARN" => LevelFilter::WARN,
        "DEBUG" => LevelFilter::DEBUG,
        "TRACE" => LevelFilter::TRACE,
        _ => LevelFilter::INFO,
    }
}

struct MessageVisitor<'a>(&'a mut String);

impl Visit for MessageVisitor<'_> {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            use std::fmt::Write;
            let _ = write!(self.0, "{value:?}");
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
