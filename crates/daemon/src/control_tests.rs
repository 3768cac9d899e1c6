// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::sync::Arc;

use tokio::sync::mpsc;
use ygg_core::MessageId;
use ygg_transport::fake::FakeTransport;
use ygg_transport::InboundChannels;

use super::*;

fn fake_transport() -> Arc<FakeTransport> {
    let (control, _rx1) = mpsc::channel(8);
    let (data, _rx2) = mpsc::channel(8);
    Arc::new(FakeTransport::new(InboundChannels { control, data }))
}

fn empty_registry() -> Registry {
    let (tx, _rx) = mpsc::channel(1);
    Registry::spawn(tx)
}

#[tokio::test]
async fn ping_replies_with_pong_event() {
    let registry = empty_registry();
    let transport = fake_transport();

    handle(ControlCommand::Ping { message_id: MessageId::new("req-1") }, &registry, &(transport.clone() as Arc<dyn Transport>)).await;

    let published = transport.published();
    assert_eq!(published.control.len(), 1);
    match &published.control[0] {
        ControlEvent::Event { content, response_to } => {
            assert_eq!(content, "pong");
            assert_eq!(*response_to, MessageId::new("req-1"));
        }
        other => panic!("expected a pong event, got {other:?}"),
    }
}

#[tokio::test]
async fn disconnect_stops_the_transport() {
    let registry = empty_registry();
    let transport = fake_transport();
    transport.start().await.unwrap();
    assert!(transport.is_started());

    handle(ControlCommand::Disconnect { message_id: MessageId::new("req-2") }, &registry, &(transport.clone() as Arc<dyn Transport>)).await;

    assert!(!transport.is_started());
}

#[tokio::test]
async fn reconnect_with_unparseable_delay_does_not_restart() {
    let registry = empty_registry();
    let transport = fake_transport();
    transport.start().await.unwrap();

    handle(
        ControlCommand::Reconnect { message_id: MessageId::new("req-3"), delay_seconds: "soon".to_string() },
        &registry,
        &(transport.clone() as Arc<dyn Transport>),
    )
    .await;

    assert!(transport.is_started(), "a bad delay must abort before disconnecting");
}

#[tokio::test]
async fn reconnect_with_valid_delay_disconnects_then_restarts() {
    let registry = empty_registry();
    let transport = fake_transport();
    transport.start().await.unwrap();

    handle(
        ControlCommand::Reconnect { message_id: MessageId::new("req-4"), delay_seconds: "0".to_string() },
        &registry,
        &(transport.clone() as Arc<dyn Transport>),
    )
    .await;

    assert!(transport.is_started(), "after a zero-second delay the transport should be restarted");
}
