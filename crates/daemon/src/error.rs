// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon-wide errors. Anything reaching [`DaemonError`] is a fatal
//! startup failure (`spec.md` §7): config, TLS, socket bind, or
//! client-ID derivation. Everything else is handled at the component
//! boundary that produced it and logged, never propagated here.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("could not determine sysconf directory")]
    NoSysconfDir,

    #[error("failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to load TLS material: {0}")]
    Tls(String),

    #[error("failed to derive client ID: {0}")]
    ClientId(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown transport kind {0:?} (expected \"broker\" or \"http-longpoll\")")]
    UnknownTransport(String),
}
