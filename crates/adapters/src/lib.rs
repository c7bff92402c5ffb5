// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concrete adaptors.
//!
//! `CommandAdaptor` wraps a command-line application: each run spawns the
//! configured executable as a managed subprocess whose stdout/stderr lines
//! flow into the logging pipeline. The `test-support` feature adds a
//! scripted adaptor used by the daemon and CLI test suites.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod command;
mod process;

#[cfg(any(test, feature = "test-support"))]
mod scripted;

pub use command::CommandAdaptor;
pub use process::{LoggingSubprocess, ProcessError};

#[cfg(any(test, feature = "test-support"))]
pub use scripted::ScriptedAdaptor;
