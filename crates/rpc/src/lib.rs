// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ygg-rpc: the local RPC surface (`spec.md` §4.4, §6) shared verbatim by
//! the daemon and every worker build, so the wire format, socket
//! addressing, and request/response shapes stay identical on both ends of
//! the connection.

mod call;
mod error;
mod protocol;
mod serve;
mod socket;
pub mod wire;

pub use call::call;
pub use error::RpcError;
pub use protocol::{FromServer, FromWorker, ToServer, ToWorker};
pub use serve::{serve, Serving};
pub use socket::SocketSpec;

/// Per-call deadline for every RPC on this surface (`spec.md` §4.4).
pub const CALL_DEADLINE: std::time::Duration = std::time::Duration::from_secs(60);
