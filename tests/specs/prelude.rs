//! Test helpers for behavioral specifications.
//!
//! Provides a small DSL for running the adaptor-runtime binary against an
//! isolated HOME directory.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{Duration, Instant};

// Aggressive timeouts for fast tests.
const OPENJD_HEARTBEAT_MS: &str = "50";
const OPENJD_CONNECT_POLL_MS: &str = "5";
const OPENJD_TIMEOUT_IPC_MS: &str = "2000";
const OPENJD_CONNECT_WAIT_MS: &str = "5000";

/// Returns the path to the adaptor-runtime binary.
///
/// Resolves relative to the test binary itself (target/debug/deps/..),
/// falling back to the manifest-relative target directory.
fn runtime_binary() -> PathBuf {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let candidate = debug_dir.join("adaptor-runtime");
            if candidate.exists() {
                return candidate;
            }
        }
    }

    Path::new(env!("CARGO_MANIFEST_DIR")).join("target/debug/adaptor-runtime")
}

/// One spec's isolated world: a temp HOME holding sockets, configuration,
/// and the connection file.
pub struct Harness {
    home: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            home: tempfile::tempdir().unwrap(),
        }
    }

    pub fn home(&self) -> &Path {
        self.home.path()
    }

    pub fn connection_file(&self) -> PathBuf {
        self.home.path().join("connection.json")
    }

    pub fn connection_file_arg(&self) -> String {
        self.connection_file().display().to_string()
    }

    /// Write a user-level runtime configuration file.
    pub fn write_user_config(&self, contents: &str) {
        let path = self
            .home
            .path()
            .join(".openjd/worker/adaptors/runtime/configuration.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    /// A command builder for the runtime binary in this world.
    pub fn runtime(&self) -> CliBuilder {
        CliBuilder::new(self.home.path())
    }

    /// Wait for a file to disappear (backend cleanup is asynchronous with
    /// the stop command's response).
    pub fn wait_until_gone(&self, path: &Path) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while path.exists() {
            assert!(
                Instant::now() < deadline,
                "file was not removed: {}",
                path.display()
            );
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        // Best-effort backend teardown if a spec bailed before stopping it
        if self.connection_file().exists() {
            let _ = self
                .runtime()
                .args(&["daemon", "stop", "--connection-file", &self.connection_file_arg()])
                .run();
        }
    }
}

/// Fluent builder running the binary with spec-friendly environment.
pub struct CliBuilder {
    args: Vec<String>,
    home: PathBuf,
}

impl CliBuilder {
    fn new(home: &Path) -> Self {
        Self {
            args: Vec::new(),
            home: home.to_path_buf(),
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.args.extend(args.iter().map(|s| s.to_string()));
        self
    }

    pub fn run(&self) -> Output {
        Command::new(runtime_binary())
            .args(&self.args)
            .env("HOME", &self.home)
            .env("OPENJD_HEARTBEAT_MS", OPENJD_HEARTBEAT_MS)
            .env("OPENJD_CONNECT_POLL_MS", OPENJD_CONNECT_POLL_MS)
            .env("OPENJD_TIMEOUT_IPC_MS", OPENJD_TIMEOUT_IPC_MS)
            .env("OPENJD_CONNECT_WAIT_MS", OPENJD_CONNECT_WAIT_MS)
            .env_remove("OPENJD_ADAPTOR_SOCKET")
            .env_remove("RUNTIME_CONFIG_PATH")
            .output()
            .expect("failed to run adaptor-runtime")
    }

    /// Run and assert success, returning stdout.
    pub fn passes(&self) -> String {
        let output = self.run();
        assert!(
            output.status.success(),
            "expected success for args {:?}\nstdout: {}\nstderr: {}",
            self.args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
        String::from_utf8_lossy(&output.stdout).into_owned()
    }

    /// Run and assert failure, returning combined stdout+stderr.
    pub fn fails(&self) -> String {
        let output = self.run();
        assert!(
            !output.status.success(),
            "expected failure for args {:?}\nstdout: {}",
            self.args,
            String::from_utf8_lossy(&output.stdout),
        );
        format!(
            "{}{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )
    }

    /// Run and return the exit code.
    pub fn exit_code(&self) -> i32 {
        self.run().status.code().unwrap_or(-1)
    }
}
