// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local IPC plumbing for the adaptor runtime.
//!
//! One transport abstraction with two backends: a UNIX-domain stream socket
//! speaking HTTP/1.1 (POSIX) and a named pipe carrying length-prefixed JSON
//! envelopes (Windows). Also home to the connection-file rendezvous the
//! frontend and backend use to find each other, and the secure-file
//! primitives both sides share.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod connection;
pub mod envelope;
mod error;
pub mod http;
pub mod secure_file;
pub mod sockets;
pub mod transport;

pub use connection::{ConnectionError, ConnectionSettings, OPENJD_ADAPTOR_SOCKET_ENV};
pub use error::IpcError;
pub use sockets::SocketPathError;
