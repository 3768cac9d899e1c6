// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control Message Handler (C7): interprets `Ping`/`Disconnect`/`Reconnect`
//! control commands arriving from the transport (`spec.md` §4.7).
//!
//! Open question (b) from `spec.md` §9: whether `Disconnect` should leave
//! the daemon able to auto-resubscribe. Resolved here as terminal —
//! `Disconnect` tears the transport down and this handler does not bring
//! it back up on its own; only an explicit `Reconnect` command (or a
//! process restart) reconnects.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;
use ygg_core::{ControlCommand, ControlEvent};
use ygg_transport::Transport;

use crate::dispatcher;
use crate::registry::Registry;

const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// Drain control commands until the channel closes, dispatching each per
/// `spec.md` §4.7.
pub async fn run(mut commands: mpsc::Receiver<ControlCommand>, registry: Registry, transport: Arc<dyn Transport>) {
    while let Some(command) = commands.recv().await {
        handle(command, &registry, &transport).await;
    }
}

async fn handle(command: ControlCommand, registry: &Registry, transport: &Arc<dyn Transport>) {
    match command {
        ControlCommand::Ping { message_id } => {
            if let Err(e) = transport.send_control(ControlEvent::pong(message_id)).await {
                warn!(error = %e, "failed to reply to ping");
            }
        }
        ControlCommand::Disconnect { .. } => {
            dispatcher::disconnect_all_workers(registry).await;
            transport.disconnect(DISCONNECT_GRACE).await;
        }
        ControlCommand::Reconnect { delay_seconds, .. } => match delay_seconds.parse::<u64>() {
            Ok(seconds) => {
                transport.disconnect(DISCONNECT_GRACE).await;
                tokio::time::sleep(Duration::from_secs(seconds)).await;
                if let Err(e) = transport.start().await {
                    warn!(error = %e, "failed to restart transport after reconnect delay");
                }
            }
            Err(e) => {
                warn!(error = %e, delay_seconds, "reconnect delay is not a valid integer, aborting reconnect");
            }
        },
    }
}

#[cfg(test)]
#[path = "control_tests.rs"]
mod tests;
