// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log buffers with ACK-based truncation.
//!
//! A buffer accepts formatted log lines from any thread and hands them to
//! the frontend in chunks. A chunk stays pending until the frontend ACKs
//! its id; re-chunking without an ACK returns a chunk that *includes* the
//! pending one, so a lost heartbeat never loses output.

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use thiserror::Error;

use adaptor_ipc::secure_file::secure_append;

use crate::model::BufferedOutput;

/// Line separator used when joining buffered records.
const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

#[derive(Debug, Error)]
pub enum BufferError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Thread-safe append-only chunked output store.
///
/// Invariants:
/// 1. No line passed to `buffer` is dropped before appearing in a chunk.
/// 2. Chunks grow monotonically until a matching `clear` lands.
/// 3. `buffer` may race `chunk`; `chunk` and `clear` serialize on the
///    pending-chunk slot.
pub trait LogBuffer: Send + Sync {
    /// Store one formatted log line.
    fn buffer(&self, line: &str);

    /// Return everything buffered since the last successful ACK under a
    /// fresh chunk id, retaining it as the pending chunk.
    fn chunk(&self) -> Result<BufferedOutput, BufferError>;

    /// Truncate the pending chunk iff `chunk_id` matches it. A `false`
    /// return means the ACK was stale and must be ignored.
    fn clear(&self, chunk_id: &str) -> bool;
}

/// Chunk id generator: wall-clock timestamp at microsecond precision,
/// bumped when the clock hasn't advanced so ids never repeat.
#[derive(Default)]
struct ChunkIds {
    last_micros: u64,
}

impl ChunkIds {
    fn next(&mut self) -> String {
        let mut micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);
        if micros <= self.last_micros {
            micros = self.last_micros + 1;
        }
        self.last_micros = micros;
        format!("{}.{:06}", micros / 1_000_000, micros % 1_000_000)
    }
}

fn join_nonempty(previous: &str, new: &str) -> String {
    if previous.is_empty() {
        new.to_string()
    } else if new.is_empty() {
        previous.to_string()
    } else {
        format!("{previous}{LINE_SEPARATOR}{new}")
    }
}

/// In-memory log buffer.
///
/// Pending lines live in a vector under the buffer lock; the pending chunk
/// lives under its own lock so `buffer` never blocks on a slow ACK.
#[derive(Default)]
pub struct InMemoryLogBuffer {
    pending: Mutex<Vec<String>>,
    chunk_state: Mutex<MemoryChunkState>,
}

#[derive(Default)]
struct MemoryChunkState {
    last_chunk: Option<BufferedOutput>,
    ids: ChunkIds,
}

impl InMemoryLogBuffer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LogBuffer for InMemoryLogBuffer {
    fn buffer(&self, line: &str) {
        self.pending.lock().push(line.to_string());
    }

    fn chunk(&self) -> Result<BufferedOutput, BufferError> {
        let lines = std::mem::take(&mut *self.pending.lock());
        let new_output = lines.join(LINE_SEPARATOR);

        let mut state = self.chunk_state.lock();
        let output = match &state.last_chunk {
            Some(previous) => join_nonempty(&previous.output, &new_output),
            None => new_output,
        };
        let chunk = BufferedOutput {
            id: state.ids.next(),
            output,
        };
        state.last_chunk = Some(chunk.clone());
        Ok(chunk)
    }

    fn clear(&self, chunk_id: &str) -> bool {
        let mut state = self.chunk_state.lock();
        match &state.last_chunk {
            Some(chunk) if chunk.id == chunk_id => {
                state.last_chunk = None;
                true
            }
            _ => false,
        }
    }
}

/// File-backed log buffer.
///
/// Lines append to a single owner-only file; the pending chunk is a byte
/// range `[start, end)` into it. `clear` advances `start` to `end`.
pub struct FileLogBuffer {
    path: PathBuf,
    file_lock: Mutex<()>,
    chunk_state: Mutex<FileChunkState>,
}

#[derive(Default)]
struct FileChunkState {
    id: Option<String>,
    start: u64,
    end: u64,
    ids: ChunkIds,
}

impl FileLogBuffer {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            file_lock: Mutex::new(()),
            chunk_state: Mutex::new(FileChunkState::default()),
        }
    }
}

impl LogBuffer for FileLogBuffer {
    fn buffer(&self, line: &str) {
        let _file_guard = self.file_lock.lock();
        // Write errors cannot be logged from inside the log sink; drop them.
        if let Ok(mut file) = secure_append(&self.path) {
            let _ = writeln!(file, "{line}");
        }
    }

    fn chunk(&self) -> Result<BufferedOutput, BufferError> {
        let mut state = self.chunk_state.lock();
        let _file_guard = self.file_lock.lock();

        let mut output = String::new();
        match std::fs::File::open(&self.path) {
            Ok(mut file) => {
                file.seek(SeekFrom::Start(state.start))?;
                file.read_to_string(&mut output)?;
                state.end = file.stream_position()?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // No lines buffered yet
                state.end = state.start;
            }
            Err(e) => return Err(e.into()),
        }

        let id = state.ids.next();
        state.id = Some(id.clone());
        Ok(BufferedOutput {
            id,
            output: output.trim_end_matches(LINE_SEPARATOR).to_string(),
        })
    }

    fn clear(&self, chunk_id: &str) -> bool {
        let mut state = self.chunk_state.lock();
        match &state.id {
            Some(id) if id == chunk_id => {
                state.start = state.end;
                state.id = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "log_buffer_tests.rs"]
mod tests;
