// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local RPC surface (`spec.md` §4.4): three methods a worker calls on
//! the daemon (`ToServer`), and two the daemon calls back on a worker
//! (`ToWorker`). Both are framed identically via [`crate::wire`].

use serde::{Deserialize, Serialize};
use ygg_core::{FeatureMap, Handler, InboundData, MessageId, OutboundData};

/// A call a worker makes into the daemon's local RPC server (C4).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ToServer {
    Register {
        handler: Handler,
        pid: u32,
        addr: String,
        detach: bool,
        features: FeatureMap,
    },
    Send {
        data: OutboundData,
    },
    GetConfig,
}

/// The daemon's reply to a [`ToServer`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FromServer {
    Registered { accepted: bool },
    Sent { message_id: MessageId },
    Config {
        log_level: String,
        ca_roots: Option<String>,
        cert_file: Option<String>,
        key_file: Option<String>,
    },
    Error { message: String },
}

/// A call the daemon makes into a worker's local RPC server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ToWorker {
    Dispatch { data: InboundData },
    Disconnect,
}

/// A worker's reply to a [`ToWorker`] call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FromWorker {
    Ack,
    Disconnected,
    Error { message: String },
}
