// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server side of the local RPC surface: one accept loop, one spawned task
//! per connection, one request answered with one response per connection
//! (`spec.md` §4.4's three server methods and two client-invoked methods
//! share this shape in both directions).

use std::future::Future;

use serde::{de::DeserializeOwned, Serialize};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::RpcError;
use crate::wire;

/// A running accept loop. Drop or call [`Serving::stop`] to tear it down.
pub struct Serving {
    shutdown: Option<oneshot::Sender<()>>,
    join: tokio::task::JoinHandle<()>,
}

impl Serving {
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.join.await;
    }
}

/// Accept connections on `listener`, answering each with `handler`.
/// `handler` is cloned per connection so it can be a closure capturing
/// shared, cheaply-cloneable state (e.g. an `Arc`-backed registry handle).
pub fn serve<Req, Resp, F, Fut>(listener: UnixListener, handler: F) -> Serving
where
    Req: DeserializeOwned + Send + 'static,
    Resp: Serialize + Send + 'static,
    F: Fn(Req) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Resp> + Send,
{
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(async move {
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            let handler = handler.clone();
                            tokio::spawn(async move {
                                if let Err(e) = handle_one(stream, handler).await {
                                    match e {
                                        RpcError::ConnectionClosed => debug!("rpc peer disconnected"),
                                        other => warn!(error = %other, "rpc connection error"),
                                    }
                                }
                            });
                        }
                        Err(e) => warn!(error = %e, "rpc accept error"),
                    }
                }
                _ = &mut shutdown_rx => return,
            }
        }
    });
    Serving { shutdown: Some(shutdown_tx), join }
}

async fn handle_one<Req, Resp, F, Fut>(mut stream: UnixStream, handler: F) -> Result<(), RpcError>
where
    Req: DeserializeOwned,
    Resp: Serialize,
    F: Fn(Req) -> Fut,
    Fut: Future<Output = Resp>,
{
    let request: Req = wire::read_value(&mut stream).await?;
    let response = handler(request).await;
    wire::write_value(&mut stream, &response).await
}

#[cfg(test)]
#[path = "serve_tests.rs"]
mod tests;
