// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ygg_core::FeatureMap;

fn record(handler: &str, pid: u32) -> WorkerRecord {
    WorkerRecord::new(Handler::new(handler), pid, format!("addr-{pid}"), false, FeatureMap::new())
}

#[tokio::test]
async fn register_then_lookup_round_trips() {
    let (tx, _rx) = mpsc::channel(1);
    let registry = Registry::spawn(tx);

    assert!(registry.register(record("echo", 100)).await);
    let found = registry.lookup(&Handler::new("echo")).await.unwrap();
    assert_eq!(found.pid, 100);
}

#[tokio::test]
async fn duplicate_handler_is_rejected() {
    let (tx, _rx) = mpsc::channel(1);
    let registry = Registry::spawn(tx);

    assert!(registry.register(record("echo", 100)).await);
    assert!(!registry.register(record("echo", 200)).await);

    let found = registry.lookup(&Handler::new("echo")).await.unwrap();
    assert_eq!(found.pid, 100, "the first registrant must keep the handler");
}

#[tokio::test]
async fn unregister_frees_the_handler_for_reuse() {
    let (tx, _rx) = mpsc::channel(1);
    let registry = Registry::spawn(tx);

    assert!(registry.register(record("echo", 100)).await);
    registry.unregister(Handler::new("echo")).await;
    assert!(registry.lookup(&Handler::new("echo")).await.is_none());
    assert!(registry.register(record("echo", 200)).await);
}

#[tokio::test]
async fn mutation_emits_a_dispatchers_token() {
    let (tx, mut rx) = mpsc::channel(1);
    let registry = Registry::spawn(tx);

    registry.register(record("echo", 100)).await;
    rx.recv().await.expect("register should emit a token");

    registry.unregister(Handler::new("echo")).await;
    rx.recv().await.expect("unregister should emit a token");
}

#[tokio::test]
async fn rejected_registration_does_not_emit_a_token() {
    let (tx, mut rx) = mpsc::channel(2);
    let registry = Registry::spawn(tx);

    registry.register(record("echo", 100)).await;
    rx.try_recv().expect("first registration emits a token");

    registry.register(record("echo", 200)).await;
    assert!(rx.try_recv().is_err(), "duplicate registration must not emit a second token");
}

#[tokio::test]
async fn snapshot_reflects_current_features() {
    let (tx, _rx) = mpsc::channel(1);
    let registry = Registry::spawn(tx);

    let mut features = FeatureMap::new();
    features.insert("version".to_string(), "1".to_string());
    registry.register(WorkerRecord::new(Handler::new("echo"), 1, "addr", false, features.clone())).await;

    let snapshot = registry.snapshot().await;
    assert_eq!(snapshot.get(&Handler::new("echo")), Some(&features));
}
