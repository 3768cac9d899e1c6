// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the local RPC surface: connect, write one request, read
//! one response, all bounded by a caller-supplied deadline (`spec.md` §4.4:
//! "All RPCs carry a per-call deadline of 60 seconds").

use std::time::Duration;

use serde::{de::DeserializeOwned, Serialize};

use crate::error::RpcError;
use crate::socket::SocketSpec;
use crate::wire;

/// Connect to `addr`, send `request`, and wait for one response — the
/// shape both "worker calls daemon" (`ToServer`/`FromServer`) and "daemon
/// calls worker" (`ToWorker`/`FromWorker`) RPCs share.
pub async fn call<Req, Resp>(addr: &SocketSpec, request: &Req, deadline: Duration) -> Result<Resp, RpcError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    tokio::time::timeout(deadline, call_inner(addr, request))
        .await
        .map_err(|_| RpcError::Timeout)?
}

async fn call_inner<Req, Resp>(addr: &SocketSpec, request: &Req) -> Result<Resp, RpcError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let mut stream = addr.connect().await?;
    wire::write_value(&mut stream, request).await?;
    wire::read_value(&mut stream).await
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
