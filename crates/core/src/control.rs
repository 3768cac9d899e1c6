// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-plane commands and events (C7).

use serde::{Deserialize, Serialize};

use crate::id::MessageId;
use crate::worker::DispatchersMap;

/// A command arriving on the control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ControlCommand {
    Ping {
        message_id: MessageId,
    },
    Disconnect {
        message_id: MessageId,
    },
    Reconnect {
        message_id: MessageId,
        /// Parsed from a string in the wire payload; parse failure aborts
        /// the reconnect (`spec.md` §4.7).
        delay_seconds: String,
    },
}

impl ControlCommand {
    pub fn message_id(&self) -> &MessageId {
        match self {
            ControlCommand::Ping { message_id }
            | ControlCommand::Disconnect { message_id }
            | ControlCommand::Reconnect { message_id, .. } => message_id,
        }
    }
}

/// An event published back on the control channel: either a reply to a
/// `Ping`, or an unsolicited connection-status advertisement (C6).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlEvent {
    Event {
        content: String,
        response_to: MessageId,
    },
    ConnectionStatus {
        dispatchers: DispatchersMap,
    },
}

impl ControlEvent {
    pub fn pong(response_to: MessageId) -> Self {
        ControlEvent::Event {
            content: "pong".to_string(),
            response_to,
        }
    }

    pub fn connection_status(dispatchers: DispatchersMap) -> Self {
        ControlEvent::ConnectionStatus { dispatchers }
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
