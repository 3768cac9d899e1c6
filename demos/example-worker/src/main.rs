// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Minimal worker used to exercise the local RPC surface end to end in
//! integration tests (`SPEC_FULL.md` §9): registers itself with the
//! daemon named by `YGG_SOCKET_ADDR`, then echoes every `Dispatch` it
//! receives back through `Send`. Not part of the daemon's shipped binary
//! set — a test fixture, not a product.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use ygg_core::{FeatureMap, Handler, OutboundData};
use ygg_rpc::{call, serve, FromServer, FromWorker, SocketSpec, ToServer, ToWorker, CALL_DEADLINE};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let log_level = std::env::var("YGG_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with_writer(std::io::stderr)
        .init();

    let daemon_addr_raw = std::env::var("YGG_SOCKET_ADDR").map_err(|_| "YGG_SOCKET_ADDR is not set")?;
    let daemon_addr = SocketSpec::parse(&daemon_addr_raw).ok_or("YGG_SOCKET_ADDR is not a valid unix: address")?;

    let handler = Handler::new(std::env::args().nth(1).unwrap_or_else(|| "echo".to_string()));

    let own_addr = SocketSpec::resolve(None, &std::env::temp_dir());
    let listener = own_addr.bind()?;
    info!(%handler, addr = %own_addr.env_value(), "worker listening");

    let features = parse_features(std::env::var("YGG_FEATURES").unwrap_or_default());

    let register = ToServer::Register {
        handler: handler.clone(),
        pid: std::process::id(),
        addr: own_addr.env_value(),
        detach: false,
        features,
    };
    match call::<ToServer, FromServer>(&daemon_addr, &register, CALL_DEADLINE).await? {
        FromServer::Registered { accepted: true } => info!(%handler, "registered with daemon"),
        FromServer::Registered { accepted: false } => return Err(format!("handler {handler} already registered").into()),
        other => return Err(format!("unexpected registration reply: {other:?}").into()),
    }

    let daemon_addr_for_handler = daemon_addr.clone();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let shutdown_tx = Arc::new(Mutex::new(Some(shutdown_tx)));
    let serving = serve::<ToWorker, FromWorker, _, _>(listener, move |request| {
        let daemon_addr = daemon_addr_for_handler.clone();
        let shutdown_tx = shutdown_tx.lock().take();
        async move { handle(request, daemon_addr, shutdown_tx).await }
    });

    let _ = shutdown_rx.await;
    serving.stop().await;
    Ok(())
}

async fn handle(request: ToWorker, daemon_addr: SocketSpec, shutdown_tx: Option<oneshot::Sender<()>>) -> FromWorker {
    match request {
        ToWorker::Dispatch { data } => {
            let echoed = OutboundData {
                message_id: data.message_id.clone(),
                response_to: Some(data.message_id),
                directive: data.directive,
                payload: data.payload,
                metadata: data.metadata,
            };
            match call::<ToServer, FromServer>(&daemon_addr, &ToServer::Send { data: echoed }, CALL_DEADLINE).await {
                Ok(FromServer::Sent { .. }) => FromWorker::Ack,
                Ok(other) => {
                    warn!(?other, "unexpected reply echoing dispatch back to daemon");
                    FromWorker::Error { message: "failed to echo payload".to_string() }
                }
                Err(e) => {
                    warn!(error = %e, "failed to echo payload back to daemon");
                    FromWorker::Error { message: e.to_string() }
                }
            }
        }
        ToWorker::Disconnect => {
            if let Some(tx) = shutdown_tx {
                tokio::spawn(async move {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    let _ = tx.send(());
                });
            }
            FromWorker::Disconnected
        }
    }
}

fn parse_features(raw: String) -> FeatureMap {
    let mut features: FeatureMap = BTreeMap::new();
    for pair in raw.split(',') {
        if let Some((key, value)) = pair.split_once('=') {
            features.insert(key.trim().to_string(), value.trim().to_string());
        }
    }
    features
}
