// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Broker-backed transport: a WebSocket connection to a message broker,
//! publishing/subscribing on `<topic_prefix>/control` and
//! `<topic_prefix>/data`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};
use tracing::{error, info, warn};
use ygg_core::{ControlCommand, ControlEvent, InboundData, OutboundData};

use crate::{InboundChannels, Transport, TransportError};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Envelope {
    topic: String,
    body: serde_json::Value,
}

/// WebSocket broker client. Frames are JSON objects `{"topic": ..., "body": ...}`
/// so a single connection multiplexes the control and data channels.
pub struct BrokerTransport {
    url: String,
    topic_prefix: String,
    inbound: InboundChannels,
    sink: Arc<Mutex<Option<tokio::sync::mpsc::UnboundedSender<Message>>>>,
}

impl BrokerTransport {
    pub fn new(url: impl Into<String>, topic_prefix: impl Into<String>, inbound: InboundChannels) -> Self {
        Self {
            url: url.into(),
            topic_prefix: topic_prefix.into(),
            inbound,
            sink: Arc::new(Mutex::new(None)),
        }
    }

    fn control_topic(&self) -> String {
        format!("{}/control", self.topic_prefix)
    }

    fn data_topic(&self) -> String {
        format!("{}/data", self.topic_prefix)
    }

    async fn publish(&self, topic: String, body: serde_json::Value) -> Result<(), TransportError> {
        let sink = {
            let guard = self.sink.lock();
            guard.clone()
        };
        let Some(sink) = sink else {
            return Err(TransportError::NotConnected);
        };
        let envelope = serde_json::to_string(&Envelope { topic, body })
            .map_err(TransportError::Serialization)?;
        sink.send(Message::Text(envelope.into()))
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }
}

#[async_trait]
impl Transport for BrokerTransport {
    async fn start(&self) -> Result<(), TransportError> {
        let (ws_stream, _) = connect_async(&self.url)
            .await
            .map_err(|e| TransportError::ConnectFailed(e.to_string()))?;
        info!(url = %self.url, "broker transport connected");

        let (write_tx, write_rx) = tokio::sync::mpsc::unbounded_channel::<Message>();
        *self.sink.lock() = Some(write_tx);

        let control_topic = self.control_topic();
        let data_topic = self.data_topic();
        let control_tx = self.inbound.control.clone();
        let data_tx = self.inbound.data.clone();

        tokio::spawn(run_connection(
            ws_stream,
            write_rx,
            control_topic,
            data_topic,
            control_tx,
            data_tx,
        ));

        Ok(())
    }

    async fn disconnect(&self, grace: Duration) {
        if let Some(sink) = self.sink.lock().take() {
            let _ = sink.send(Message::Close(None));
        }
        tokio::time::sleep(grace).await;
    }

    async fn send_control(&self, event: ControlEvent) -> Result<(), TransportError> {
        let body = serde_json::to_value(&event).map_err(TransportError::Serialization)?;
        self.publish(self.control_topic(), body).await
    }

    async fn send_data(&self, data: OutboundData) -> Result<(), TransportError> {
        let body = serde_json::to_value(&data).map_err(TransportError::Serialization)?;
        self.publish(self.data_topic(), body).await
    }
}

async fn run_connection(
    ws_stream: WsStream,
    mut write_rx: tokio::sync::mpsc::UnboundedReceiver<Message>,
    control_topic: String,
    data_topic: String,
    control_tx: tokio::sync::mpsc::Sender<ControlCommand>,
    data_tx: tokio::sync::mpsc::Sender<InboundData>,
) {
    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            outgoing = write_rx.recv() => {
                match outgoing {
                    Some(msg) => {
                        let is_close = matches!(msg, Message::Close(_));
                        if let Err(e) = write.send(msg).await {
                            error!("broker write failed: {}", e);
                            return;
                        }
                        if is_close {
                            return;
                        }
                    }
                    None => return,
                }
            }
            incoming = read.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_envelope(&text, &control_topic, &data_topic, &control_tx, &data_tx).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        info!("broker connection closed");
                        return;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("broker read error: {}", e);
                        return;
                    }
                }
            }
        }
    }
}

async fn handle_envelope(
    text: &str,
    control_topic: &str,
    data_topic: &str,
    control_tx: &tokio::sync::mpsc::Sender<ControlCommand>,
    data_tx: &tokio::sync::mpsc::Sender<InboundData>,
) {
    let envelope: Envelope = match serde_json::from_str(text) {
        Ok(e) => e,
        Err(e) => {
            warn!("malformed broker envelope, dropping: {}", e);
            return;
        }
    };

    if envelope.topic == control_topic {
        match serde_json::from_value::<ControlCommand>(envelope.body) {
            Ok(cmd) => {
                let _ = control_tx.send(cmd).await;
            }
            Err(e) => warn!("malformed control command, dropping: {}", e),
        }
    } else if envelope.topic == data_topic {
        match serde_json::from_value::<InboundData>(envelope.body) {
            Ok(data) => {
                let _ = data_tx.send(data).await;
            }
            Err(e) => warn!("malformed inbound data, dropping: {}", e),
        }
    }
}

#[cfg(test)]
#[path = "broker_tests.rs"]
mod tests;
