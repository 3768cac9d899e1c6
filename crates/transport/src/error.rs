// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport not connected")]
    NotConnected,

    #[error("connect failed: {0}")]
    ConnectFailed(String),

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
