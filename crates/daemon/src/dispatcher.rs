// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatcher Core (C5): routes inbound data to workers, forwards
//! worker-produced data to the transport, and reacts to worker deaths
//! (`spec.md` §4.5).
//!
//! Four channels, as specified: `sendQ` (transport -> worker, 1024),
//! `recvQ` (worker -> transport, 1024), `dispatchers` (owned by the
//! registry, see [`crate::registry`]) and `deadWorkers` (unbounded,
//! `spec.md` §4.5: "unbounded (drained promptly)").
//!
//! Dispatch to distinct workers proceeds concurrently; messages to the
//! *same* worker are serialised through one lightweight per-handler task
//! so in-handler ordering is preserved (`spec.md` §4.5.1, §5).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::warn;
use ygg_core::{Handler, InboundData, OutboundData};
use ygg_rpc::{call, FromWorker, SocketSpec, ToWorker, CALL_DEADLINE};
use ygg_transport::Transport;
use ygg_workers::WorkerDied;

use crate::registry::Registry;

const QUEUE_CAPACITY: usize = 1024;
/// Per-handler queue depth; generous enough that a momentarily slow
/// worker doesn't make the routing loop block on `send`.
const HANDLER_QUEUE_CAPACITY: usize = 256;

/// Handle exposed to the rest of the daemon: the death-notification sink
/// C1 posts to.
///
/// `sendQ` and `recvQ` themselves are created by the caller and handed in
/// as `send_rx`/`recv_tx`/`recv_rx` rather than created here: `recv_tx` is
/// also a constructor argument to C4 (`rpc_server::spawn`), which
/// `spec.md` §4.9 requires to start *before* C5's channels do, so the
/// channel has to exist before either one is spawned.
#[derive(Clone)]
pub struct DispatcherHandle {
    pub dead_tx: mpsc::UnboundedSender<WorkerDied>,
}

/// Start the three independent loops that make up C5.
pub fn spawn(
    registry: Registry,
    transport: Arc<dyn Transport>,
    send_rx: mpsc::Receiver<InboundData>,
    recv_tx: mpsc::Sender<OutboundData>,
    recv_rx: mpsc::Receiver<OutboundData>,
) -> DispatcherHandle {
    let (dead_tx, dead_rx) = mpsc::unbounded_channel();

    tokio::spawn(route_inbound(send_rx, registry.clone(), recv_tx));
    tokio::spawn(forward_outbound(recv_rx, transport));
    tokio::spawn(handle_deaths(dead_rx, registry));

    DispatcherHandle { dead_tx }
}

async fn route_inbound(mut send_rx: mpsc::Receiver<InboundData>, registry: Registry, errors_tx: mpsc::Sender<OutboundData>) {
    let mut queues: HashMap<Handler, mpsc::Sender<InboundData>> = HashMap::new();

    while let Some(data) = send_rx.recv().await {
        if registry.lookup(&data.directive).await.is_none() {
            warn!(directive = %data.directive, "no worker registered for directive, dropping");
            if let Some(response_to) = data.response_to.clone() {
                let error = OutboundData::routing_error(response_to, data.directive.clone(), "unknown handler");
                let _ = errors_tx.send(error).await;
            }
            continue;
        }

        let handler = data.directive.clone();
        let queue = queues.entry(handler.clone()).or_insert_with(|| {
            let (tx, rx) = mpsc::channel(HANDLER_QUEUE_CAPACITY);
            tokio::spawn(dispatch_to_worker(handler.clone(), rx, registry.clone(), errors_tx.clone()));
            tx
        });

        if queue.send(data).await.is_err() {
            queues.remove(&handler);
        }
    }
}

async fn dispatch_to_worker(
    handler: Handler,
    mut rx: mpsc::Receiver<InboundData>,
    registry: Registry,
    errors_tx: mpsc::Sender<OutboundData>,
) {
    while let Some(data) = rx.recv().await {
        let Some(record) = registry.lookup(&handler).await else {
            warn!(%handler, "worker unregistered before dispatch, dropping");
            if let Some(response_to) = data.response_to.clone() {
                let error = OutboundData::routing_error(response_to, handler.clone(), "worker no longer registered");
                let _ = errors_tx.send(error).await;
            }
            continue;
        };

        let Some(addr) = SocketSpec::parse(&record.socket_addr) else {
            warn!(%handler, addr = %record.socket_addr, "worker socket address is malformed");
            continue;
        };

        let response_to = data.response_to.clone();
        let message_id = data.message_id.clone();
        match call::<ToWorker, FromWorker>(&addr, &ToWorker::Dispatch { data }, CALL_DEADLINE).await {
            Ok(FromWorker::Ack) => {}
            Ok(FromWorker::Error { message }) => {
                warn!(%handler, %message_id, error = %message, "worker reported a dispatch error");
            }
            Ok(FromWorker::Disconnected) => {
                warn!(%handler, %message_id, "worker reported itself disconnected");
            }
            Err(e) => {
                warn!(%handler, %message_id, error = %e, "dispatch rpc failed");
                if let Some(response_to) = response_to {
                    let error = OutboundData::routing_error(response_to, handler.clone(), "dispatch rpc failed");
                    let _ = errors_tx.send(error).await;
                }
            }
        }
    }
}

async fn forward_outbound(mut recv_rx: mpsc::Receiver<OutboundData>, transport: Arc<dyn Transport>) {
    while let Some(data) = recv_rx.recv().await {
        if let Err(e) = transport.send_data(data).await {
            warn!(error = %e, "failed to publish outbound data, not retrying");
        }
    }
}

async fn handle_deaths(mut dead_rx: mpsc::UnboundedReceiver<WorkerDied>, registry: Registry) {
    while let Some(died) = dead_rx.recv().await {
        registry.unregister(died.handler).await;
    }
}

/// Broadcast `Disconnect` to every registered worker, best-effort
/// (`spec.md` §4.7). Used by the control handler (C7) and by shutdown (C9).
pub async fn disconnect_all_workers(registry: &Registry) {
    let snapshot = registry.snapshot().await;
    for handler in snapshot.keys() {
        let Some(record) = registry.lookup(handler).await else { continue };
        let Some(addr) = SocketSpec::parse(&record.socket_addr) else { continue };
        if let Err(e) = call::<ToWorker, FromWorker>(&addr, &ToWorker::Disconnect, Duration::from_secs(5)).await {
            warn!(%handler, error = %e, "failed to notify worker of disconnect");
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
