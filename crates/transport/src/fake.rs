// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! An in-process [`Transport`] for daemon and integration tests: records
//! every published control/data message instead of touching the network,
//! and lets a test inject inbound traffic directly.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use ygg_core::{ControlCommand, ControlEvent, InboundData, OutboundData};

use crate::{InboundChannels, Transport, TransportError};

#[derive(Default, Clone)]
pub struct Published {
    pub control: Vec<ControlEvent>,
    pub data: Vec<OutboundData>,
}

pub struct FakeTransport {
    inbound: InboundChannels,
    published: Arc<Mutex<Published>>,
    started: Arc<Mutex<bool>>,
    fail_sends: Arc<Mutex<bool>>,
}

impl FakeTransport {
    pub fn new(inbound: InboundChannels) -> Self {
        Self {
            inbound,
            published: Arc::new(Mutex::new(Published::default())),
            started: Arc::new(Mutex::new(false)),
            fail_sends: Arc::new(Mutex::new(false)),
        }
    }

    /// Snapshot of everything published through `send_control`/`send_data` so far.
    pub fn published(&self) -> Published {
        self.published.lock().clone()
    }

    pub fn is_started(&self) -> bool {
        *self.started.lock()
    }

    /// Make subsequent `send_control`/`send_data` calls fail, to exercise
    /// daemon error paths.
    pub fn set_fail_sends(&self, fail: bool) {
        *self.fail_sends.lock() = fail;
    }

    /// Deliver a control command to the daemon as though it arrived from
    /// the remote peer.
    pub async fn inject_control(&self, command: ControlCommand) {
        let _ = self.inbound.control.send(command).await;
    }

    /// Deliver inbound data to the daemon as though it arrived from the
    /// remote peer.
    pub async fn inject_data(&self, data: InboundData) {
        let _ = self.inbound.data.send(data).await;
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn start(&self) -> Result<(), TransportError> {
        *self.started.lock() = true;
        Ok(())
    }

    async fn disconnect(&self, _grace: Duration) {
        *self.started.lock() = false;
    }

    async fn send_control(&self, event: ControlEvent) -> Result<(), TransportError> {
        if *self.fail_sends.lock() {
            return Err(TransportError::SendFailed("fake transport configured to fail".into()));
        }
        self.published.lock().control.push(event);
        Ok(())
    }

    async fn send_data(&self, data: OutboundData) -> Result<(), TransportError> {
        if *self.fail_sends.lock() {
            return Err(TransportError::SendFailed("fake transport configured to fail".into()));
        }
        self.published.lock().data.push(data);
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
