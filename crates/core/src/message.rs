// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Data-plane messages that flow between the transport and workers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::{Handler, MessageId};

/// A data message travelling toward a worker (from the transport's data
/// channel, routed by `Directive`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundData {
    pub message_id: MessageId,
    pub response_to: Option<MessageId>,
    pub directive: Handler,
    pub payload: Vec<u8>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A data message travelling from a worker back toward the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundData {
    pub message_id: MessageId,
    pub response_to: Option<MessageId>,
    pub directive: Handler,
    pub payload: Vec<u8>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl OutboundData {
    /// Build the error event emitted back through `recvQ` when an inbound
    /// message cannot be routed and carried a `response_to` id (`spec.md` §4.5.1).
    pub fn routing_error(response_to: MessageId, directive: Handler, reason: &str) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("error".to_string(), reason.to_string());
        Self {
            message_id: MessageId::new(uuid::Uuid::new_v4().to_string()),
            response_to: Some(response_to),
            directive,
            payload: Vec::new(),
            metadata,
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
