// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Registry (C3): a single-writer actor task owning the
//! handler -> [`WorkerRecord`] map (`spec.md` §4.3, §9 Design Notes
//! "Registry as a single-writer actor"). All other components mutate it
//! by sending commands over a channel and read it via consistent
//! snapshots; there is no shared lock to race on.
//!
//! Every successful mutation (`register`, `unregister`) pushes a
//! non-blocking token onto the `dispatchers` channel so the Advertisement
//! Engine (C6) knows to re-check its hash — "whenever C3 is mutated ...
//! emit a token on `dispatchers`" (`spec.md` §4.5.3).

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use ygg_core::{DispatchersMap, Handler, WorkerRecord};

enum Command {
    Register { record: WorkerRecord, reply: oneshot::Sender<bool> },
    Unregister { handler: Handler, reply: oneshot::Sender<()> },
    Lookup { handler: Handler, reply: oneshot::Sender<Option<WorkerRecord>> },
    Snapshot { reply: oneshot::Sender<DispatchersMap> },
}

/// A handle to the registry actor. Cheap to clone; every clone talks to
/// the same underlying map.
#[derive(Clone)]
pub struct Registry {
    tx: mpsc::Sender<Command>,
}

impl Registry {
    /// Spawn the registry actor. `dispatchers` is the size-1 channel C6
    /// listens on; pushes to it are non-blocking (`spec.md` §4.5.3 —
    /// "if the channel is full the pending advertisement already covers
    /// the newer state").
    pub fn spawn(dispatchers: mpsc::Sender<()>) -> Self {
        let (tx, rx) = mpsc::channel(256);
        tokio::spawn(run(rx, dispatchers));
        Self { tx }
    }

    /// Register a worker. Rejected (`false`) if the handler is already
    /// claimed by a live entry — duplicate handlers are forbidden
    /// (`spec.md` §4.3).
    pub async fn register(&self, record: WorkerRecord) -> bool {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Register { record, reply }).await.is_err() {
            return false;
        }
        rx.await.unwrap_or(false)
    }

    /// Remove an entry if present. Idempotent.
    pub async fn unregister(&self, handler: Handler) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Unregister { handler, reply }).await.is_err() {
            return;
        }
        let _ = rx.await;
    }

    pub async fn lookup(&self, handler: &Handler) -> Option<WorkerRecord> {
        let (reply, rx) = oneshot::channel();
        self.tx.send(Command::Lookup { handler: handler.clone(), reply }).await.ok()?;
        rx.await.ok().flatten()
    }

    /// Consistent snapshot of the dispatchers map (`spec.md` §3: "handler
    /// name -> feature mapping ... precisely the value published
    /// upstream").
    pub async fn snapshot(&self) -> DispatchersMap {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Snapshot { reply }).await.is_err() {
            return DispatchersMap::new();
        }
        rx.await.unwrap_or_default()
    }
}

async fn run(mut rx: mpsc::Receiver<Command>, dispatchers: mpsc::Sender<()>) {
    let mut workers: HashMap<Handler, WorkerRecord> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            Command::Register { record, reply } => {
                let accepted = !workers.contains_key(&record.handler);
                if accepted {
                    workers.insert(record.handler.clone(), record);
                    notify_changed(&dispatchers);
                }
                let _ = reply.send(accepted);
            }
            Command::Unregister { handler, reply } => {
                if workers.remove(&handler).is_some() {
                    notify_changed(&dispatchers);
                }
                let _ = reply.send(());
            }
            Command::Lookup { handler, reply } => {
                let _ = reply.send(workers.get(&handler).cloned());
            }
            Command::Snapshot { reply } => {
                let snapshot = workers.iter().map(|(h, r)| (h.clone(), r.features.clone())).collect();
                let _ = reply.send(snapshot);
            }
        }
    }
}

fn notify_changed(dispatchers: &mpsc::Sender<()>) {
    match dispatchers.try_send(()) {
        Ok(()) | Err(mpsc::error::TrySendError::Full(())) => {}
        Err(mpsc::error::TrySendError::Closed(())) => {}
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
