// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Logging setup, mirroring the teacher's `setup_logging`: a non-blocking
//! file appender plus an `EnvFilter` that defaults to the configured
//! `YGG_LOG_LEVEL` when `RUST_LOG` isn't set.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::env::Config;
use crate::error::DaemonError;

/// Initialise the global tracing subscriber. The returned guard must be
/// held for the lifetime of the process — dropping it stops the
/// non-blocking writer from flushing.
pub fn setup(config: &Config) -> Result<tracing_appender::non_blocking::WorkerGuard, DaemonError> {
    let parent = config.log_path.parent().ok_or(DaemonError::NoStateDir)?;
    std::fs::create_dir_all(parent)?;

    let file_name = config.log_path.file_name().ok_or(DaemonError::NoStateDir)?;
    let file_appender = tracing_appender::rolling::never(parent, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
