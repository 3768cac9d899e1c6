// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ygg-transport: the remote control/data plane, abstracted as a capability
//! set (`spec.md` §9 Design Notes: "Transport as a capability set").
//!
//! The dispatcher holds only the [`Transport`] trait object, never a
//! concrete broker or HTTP client. Two backends are provided: a WebSocket
//! broker client ([`broker::BrokerTransport`]) and an HTTP long-poll client
//! ([`http_longpoll::HttpLongPollTransport`]).

mod error;

pub mod broker;
pub mod http_longpoll;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use ygg_core::{ControlCommand, ControlEvent, InboundData, OutboundData};

pub use error::TransportError;

/// Channels through which a transport delivers inbound traffic to the
/// dispatcher — "invoke the daemon-provided callbacks on inbound traffic"
/// (`spec.md` §6).
pub struct InboundChannels {
    pub control: mpsc::Sender<ControlCommand>,
    pub data: mpsc::Sender<InboundData>,
}

/// Capability set exposed by a remote transport: `Start`, `Disconnect`,
/// `SendControl`, `SendData` (`spec.md` §6).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Connect (or reconnect) and begin delivering inbound traffic to the
    /// channels supplied at construction.
    async fn start(&self) -> Result<(), TransportError>;

    /// Disconnect, waiting up to `grace` for in-flight I/O to settle.
    async fn disconnect(&self, grace: Duration);

    /// Publish a control-plane event: a `Pong` reply or a connection-status
    /// advertisement (C6).
    async fn send_control(&self, event: ControlEvent) -> Result<(), TransportError>;

    /// Publish a data-plane message produced by a worker.
    async fn send_data(&self, data: OutboundData) -> Result<(), TransportError>;
}
