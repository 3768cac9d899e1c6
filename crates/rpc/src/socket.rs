// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Socket addressing for the local RPC surface (`spec.md` §4.4, §9 Design
//! Notes "Abstract-socket vs filesystem-socket"): an abstract Linux socket
//! named with a random 6-character suffix when no explicit path is
//! configured, falling back to a filesystem socket under a runtime
//! directory with `0700` permissions on platforms without abstract-socket
//! support. Equivalence is in addressing only — both are plain
//! `tokio::net::UnixListener`/`UnixStream` once bound or connected.

use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// Address of a local RPC socket: either a Linux abstract-namespace name
/// or a filesystem path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SocketSpec {
    /// Linux abstract socket name (no leading NUL, no `@`).
    Abstract(String),
    Path(PathBuf),
}

impl SocketSpec {
    /// Resolve the socket address the daemon should bind: `explicit` wins
    /// if configured (`YGG_SOCKET_PATH`), otherwise a daemon-chosen
    /// abstract name with a random suffix (path-based on non-Linux).
    pub fn resolve(explicit: Option<PathBuf>, runtime_dir: &Path) -> Self {
        if let Some(path) = explicit {
            return SocketSpec::Path(path);
        }
        let suffix = nanoid::nanoid!(6, &ALPHABET);
        if cfg!(target_os = "linux") {
            SocketSpec::Abstract(format!("ygg-{suffix}"))
        } else {
            SocketSpec::Path(runtime_dir.join(format!("ygg-{suffix}.sock")))
        }
    }

    /// Value to hand a worker via `YGG_SOCKET_ADDR` (`spec.md` §6):
    /// `unix:@<name>` for abstract sockets, `unix:<path>` otherwise.
    pub fn env_value(&self) -> String {
        match self {
            SocketSpec::Abstract(name) => format!("unix:@{name}"),
            SocketSpec::Path(path) => format!("unix:{}", path.display()),
        }
    }

    /// Parse a `YGG_SOCKET_ADDR`-style value back into a [`SocketSpec`].
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.strip_prefix("unix:")?;
        if let Some(name) = rest.strip_prefix('@') {
            Some(SocketSpec::Abstract(name.to_string()))
        } else {
            Some(SocketSpec::Path(PathBuf::from(rest)))
        }
    }

    pub fn bind(&self) -> std::io::Result<tokio::net::UnixListener> {
        match self {
            SocketSpec::Path(path) => {
                if path.exists() {
                    std::fs::remove_file(path)?;
                }
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                    #[cfg(unix)]
                    std::fs::set_permissions(parent, std::fs::Permissions::from_mode(0o700))?;
                }
                tokio::net::UnixListener::bind(path)
            }
            SocketSpec::Abstract(name) => bind_abstract(name),
        }
    }

    pub async fn connect(&self) -> std::io::Result<tokio::net::UnixStream> {
        match self {
            SocketSpec::Path(path) => tokio::net::UnixStream::connect(path).await,
            SocketSpec::Abstract(name) => connect_abstract(name).await,
        }
    }

    /// Remove the underlying filesystem artifact, if any (no-op for
    /// abstract sockets, which have no backing file).
    pub fn remove(&self) {
        if let SocketSpec::Path(path) = self {
            let _ = std::fs::remove_file(path);
        }
    }

    pub fn exists(&self) -> bool {
        match self {
            SocketSpec::Path(path) => path.exists(),
            SocketSpec::Abstract(_) => true,
        }
    }
}

const ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i',
    'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

#[cfg(target_os = "linux")]
fn bind_abstract(name: &str) -> std::io::Result<tokio::net::UnixListener> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::{SocketAddr, UnixListener as StdUnixListener};

    let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
    let std_listener = StdUnixListener::bind_addr(&addr)?;
    std_listener.set_nonblocking(true)?;
    tokio::net::UnixListener::from_std(std_listener)
}

#[cfg(target_os = "linux")]
async fn connect_abstract(name: &str) -> std::io::Result<tokio::net::UnixStream> {
    use std::os::linux::net::SocketAddrExt;
    use std::os::unix::net::{SocketAddr, UnixStream as StdUnixStream};

    let name = name.to_string();
    tokio::task::spawn_blocking(move || {
        let addr = SocketAddr::from_abstract_name(name.as_bytes())?;
        let std_stream = StdUnixStream::connect_addr(&addr)?;
        std_stream.set_nonblocking(true)?;
        tokio::net::UnixStream::from_std(std_stream)
    })
    .await
    .unwrap_or_else(|e| Err(std::io::Error::other(e)))
}

#[cfg(not(target_os = "linux"))]
fn bind_abstract(_name: &str) -> std::io::Result<tokio::net::UnixListener> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "abstract sockets are only available on Linux",
    ))
}

#[cfg(not(target_os = "linux"))]
async fn connect_abstract(_name: &str) -> std::io::Result<tokio::net::UnixStream> {
    Err(std::io::Error::new(
        std::io::ErrorKind::Unsupported,
        "abstract sockets are only available on Linux",
    ))
}

#[cfg(test)]
#[path = "socket_tests.rs"]
mod tests;
