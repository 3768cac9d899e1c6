// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP long-poll transport: separate control and data endpoints, each
//! polled with a blocking GET that the server holds open until a message
//! is available (or a timeout elapses), and posted to with a plain POST.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use ygg_core::{ControlCommand, ControlEvent, InboundData, OutboundData};

use crate::{InboundChannels, Transport, TransportError};

const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP long-poll client. `control_url` and `data_url` are each polled with
/// `GET ?wait=<poll_timeout_secs>` in a dedicated background task and
/// written to with plain `POST`.
pub struct HttpLongPollTransport {
    client: reqwest::Client,
    control_url: String,
    data_url: String,
    inbound: InboundChannels,
    poll_tasks: Mutex<Vec<JoinHandle<()>>>,
    stop: Arc<tokio::sync::Notify>,
}

impl HttpLongPollTransport {
    pub fn new(control_url: impl Into<String>, data_url: impl Into<String>, inbound: InboundChannels) -> Self {
        Self {
            client: reqwest::Client::new(),
            control_url: control_url.into(),
            data_url: data_url.into(),
            inbound,
            poll_tasks: Mutex::new(Vec::new()),
            stop: Arc::new(tokio::sync::Notify::new()),
        }
    }
}

#[async_trait]
impl Transport for HttpLongPollTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let control_handle = spawn_control_poll(
            self.client.clone(),
            self.control_url.clone(),
            self.inbound.control.clone(),
            self.stop.clone(),
        );
        let data_handle = spawn_data_poll(
            self.client.clone(),
            self.data_url.clone(),
            self.inbound.data.clone(),
            self.stop.clone(),
        );
        *self.poll_tasks.lock() = vec![control_handle, data_handle];
        Ok(())
    }

    async fn disconnect(&self, grace: Duration) {
        self.stop.notify_waiters();
        let handles: Vec<_> = self.poll_tasks.lock().drain(..).collect();
        let _ = tokio::time::timeout(grace, futures_util::future::join_all(handles)).await;
    }

    async fn send_control(&self, event: ControlEvent) -> Result<(), TransportError> {
        post(&self.client, &self.control_url, &event).await
    }

    async fn send_data(&self, data: OutboundData) -> Result<(), TransportError> {
        post(&self.client, &self.data_url, &data).await
    }
}

async fn post<T: serde::Serialize>(
    client: &reqwest::Client,
    url: &str,
    body: &T,
) -> Result<(), TransportError> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| TransportError::SendFailed(e.to_string()))?;
    if !response.status().is_success() {
        return Err(TransportError::SendFailed(format!(
            "server returned {}",
            response.status()
        )));
    }
    Ok(())
}

fn spawn_control_poll(
    client: reqwest::Client,
    url: String,
    control_tx: mpsc::Sender<ControlCommand>,
    stop: Arc<tokio::sync::Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.notified() => return,
                result = poll_once::<ControlCommand>(&client, &url) => {
                    match result {
                        Ok(Some(cmd)) => {
                            let _ = control_tx.send(cmd).await;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("control long-poll failed: {}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    })
}

fn spawn_data_poll(
    client: reqwest::Client,
    url: String,
    data_tx: mpsc::Sender<InboundData>,
    stop: Arc<tokio::sync::Notify>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = stop.notified() => return,
                result = poll_once::<InboundData>(&client, &url) => {
                    match result {
                        Ok(Some(data)) => {
                            let _ = data_tx.send(data).await;
                        }
                        Ok(None) => {}
                        Err(e) => {
                            warn!("data long-poll failed: {}", e);
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    })
}

async fn poll_once<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> Result<Option<T>, reqwest::Error> {
    let response = client
        .get(url)
        .query(&[("wait", POLL_TIMEOUT.as_secs())])
        .timeout(POLL_TIMEOUT + Duration::from_secs(5))
        .send()
        .await?;

    if response.status() == reqwest::StatusCode::NO_CONTENT {
        debug!("long-poll to {} timed out with no message", url);
        return Ok(None);
    }

    let value = response.json::<T>().await?;
    Ok(Some(value))
}

#[cfg(test)]
#[path = "http_longpoll_tests.rs"]
mod tests;
