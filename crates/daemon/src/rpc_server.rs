// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local RPC Server (C4): the UNIX-socket-facing half of the local RPC
//! surface, serving the three worker-initiated methods (`spec.md` §4.4):
//! `Register`, `Send`, `GetConfig`.

use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::info;
use ygg_core::{IdGen, OutboundData, WorkerRecord};
use ygg_rpc::{FromServer, Serving, SocketSpec, ToServer};

use crate::env::Config;
use crate::registry::Registry;

/// Everything the server needs to answer a `ToServer` call.
#[derive(Clone)]
struct ServerState<I: IdGen> {
    registry: Registry,
    recv_tx: mpsc::Sender<OutboundData>,
    id_gen: I,
    log_level: String,
    ca_roots: Option<PathBuf>,
    cert_file: Option<PathBuf>,
    key_file: Option<PathBuf>,
}

/// Resolve the bind address (`YGG_SOCKET_PATH` or a daemon-chosen
/// abstract name) and start accepting connections.
pub fn spawn<I: IdGen + 'static>(
    config: &Config,
    registry: Registry,
    recv_tx: mpsc::Sender<OutboundData>,
    id_gen: I,
) -> std::io::Result<(SocketSpec, Serving)> {
    let addr = SocketSpec::resolve(config.socket_path.clone(), &config.state_dir);
    let listener = addr.bind()?;
    info!(addr = %addr.env_value(), "local rpc server listening");

    let state = ServerState {
        registry,
        recv_tx,
        id_gen,
        log_level: config.log_level.clone(),
        ca_roots: config.ca_roots.clone(),
        cert_file: config.cert_file.clone(),
        key_file: config.key_file.clone(),
    };

    let serving = ygg_rpc::serve::<ToServer, FromServer, _, _>(listener, move |request| {
        let state = state.clone();
        async move { handle(request, state).await }
    });

    Ok((addr, serving))
}

async fn handle<I: IdGen>(request: ToServer, state: ServerState<I>) -> FromServer {
    match request {
        ToServer::Register { handler, pid, addr, detach, features } => {
            let accepted = state.registry.register(WorkerRecord::new(handler, pid, addr, detach, features)).await;
            FromServer::Registered { accepted }
        }
        ToServer::Send { data } => {
            if state.recv_tx.send(data).await.is_err() {
                return FromServer::Error { message: "dispatcher is no longer accepting outbound data".to_string() };
            }
            FromServer::Sent { message_id: state.id_gen.next() }
        }
        ToServer::GetConfig => FromServer::Config {
            log_level: state.log_level.clone(),
            ca_roots: state.ca_roots.as_ref().map(|p| p.display().to_string()),
            cert_file: state.cert_file.as_ref().map(|p| p.display().to_string()),
            key_file: state.key_file.as_ref().map(|p| p.display().to_string()),
        },
    }
}

#[cfg(test)]
#[path = "rpc_server_tests.rs"]
mod tests;
