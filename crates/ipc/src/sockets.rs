// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Endpoint path selection for the backend's listening socket.
//!
//! Sockets live under `.openjd/adaptors/sockets/<namespace>/` in the first
//! base directory that yields a bindable name: the user's home directory,
//! then the temp directory (only when its sticky bit is set). UNIX socket
//! names have a hard length cap, so every candidate is verified before the
//! directory is created.

use std::path::{Path, PathBuf};

use thiserror::Error;
use uuid::Uuid;

const SOCKET_REL_PATH: &str = ".openjd/adaptors/sockets";

// sun_path is 108 bytes on Linux and 104 on macOS, one of which is the
// null terminator. See unix(7) "Address format".
#[cfg(target_os = "macos")]
const SOCKET_NAME_MAX_LENGTH: usize = 104 - 1;
#[cfg(not(target_os = "macos"))]
const SOCKET_NAME_MAX_LENGTH: usize = 108 - 1;

#[derive(Debug, Error)]
pub enum SocketPathError {
    #[error("Failed to find a suitable socket path for the following reasons: {}", .0.join("; "))]
    NoSocketPathFound(Vec<String>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Pick the socket path for this process in the given namespace.
///
/// `base_dir` restricts the search to one directory (used by tests); the
/// default search is home then temp. With `create_dir` the socket's parent
/// directory is created mode 0700.
pub fn process_socket_path(
    namespace: &str,
    base_dir: Option<&Path>,
    create_dir: bool,
) -> Result<PathBuf, SocketPathError> {
    socket_path(&std::process::id().to_string(), namespace, base_dir, create_dir)
}

/// Pick a socket path with an explicit base name.
pub fn socket_path(
    base_name: &str,
    namespace: &str,
    base_dir: Option<&Path>,
    create_dir: bool,
) -> Result<PathBuf, SocketPathError> {
    let mut reasons: Vec<String> = Vec::new();

    let candidates: Vec<PathBuf> = match base_dir {
        Some(dir) => vec![dir.join(namespace)],
        None => {
            let mut dirs = Vec::new();
            if let Some(home) = home_dir() {
                dirs.push(home.join(SOCKET_REL_PATH).join(namespace));
            } else {
                reasons.push("Cannot determine the user home directory".to_string());
            }
            dirs.push(std::env::temp_dir().join(SOCKET_REL_PATH).join(namespace));
            dirs
        }
    };

    for socket_dir in candidates {
        let path = unique_socket_path(&socket_dir, base_name);

        if let Err(reason) = verify_socket_path(&path) {
            reasons.push(format!(
                "Cannot create socket at '{}' because: {}",
                path.display(),
                reason
            ));
            continue;
        }

        // The temp directory is only trustworthy with the restricted
        // deletion flag set; any user could otherwise unlink and replace
        // the socket.
        if base_dir.is_none() && socket_dir.starts_with(std::env::temp_dir()) {
            let temp_dir = std::env::temp_dir();
            if !has_sticky_bit(&temp_dir) {
                reasons.push(format!(
                    "Cannot use temporary directory {} because it does not have the sticky bit \
                     (restricted deletion flag) set",
                    temp_dir.display()
                ));
                continue;
            }
        }

        if create_dir {
            make_socket_dir(&socket_dir)?;
        }
        return Ok(path);
    }

    Err(SocketPathError::NoSocketPathFound(reasons))
}

/// Append a uuid suffix until the name does not collide with an existing file.
fn unique_socket_path(dir: &Path, base_name: &str) -> PathBuf {
    let mut path = dir.join(base_name);
    while path.exists() {
        path = dir.join(format!("{}_{}", base_name, Uuid::new_v4().simple()));
    }
    path
}

fn verify_socket_path(path: &Path) -> Result<(), String> {
    let length = path.as_os_str().len();
    if length > SOCKET_NAME_MAX_LENGTH {
        return Err(format!(
            "Socket name too long. The maximum allowed size is {SOCKET_NAME_MAX_LENGTH} bytes, \
             but the name has a size of {length}: {}",
            path.display()
        ));
    }
    Ok(())
}

#[cfg(unix)]
fn make_socket_dir(dir: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    std::fs::DirBuilder::new()
        .recursive(true)
        .mode(0o700)
        .create(dir)
}

#[cfg(not(unix))]
fn make_socket_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)
}

#[cfg(unix)]
fn has_sticky_bit(dir: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;
    match std::fs::metadata(dir) {
        Ok(meta) => meta.mode() & 0o1000 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn has_sticky_bit(_dir: &Path) -> bool {
    true
}

fn home_dir() -> Option<PathBuf> {
    #[cfg(unix)]
    let var = "HOME";
    #[cfg(not(unix))]
    let var = "USERPROFILE";

    std::env::var(var).ok().filter(|v| !v.is_empty()).map(PathBuf::from)
}

#[cfg(test)]
#[path = "sockets_tests.rs"]
mod tests;
