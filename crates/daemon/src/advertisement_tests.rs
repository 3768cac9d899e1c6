// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use ygg_core::{FeatureMap, Handler, WorkerRecord};
use ygg_transport::fake::FakeTransport;
use ygg_transport::InboundChannels;

use super::*;

fn fake_transport() -> Arc<FakeTransport> {
    let (control, _rx1) = mpsc::channel(8);
    let (data, _rx2) = mpsc::channel(8);
    Arc::new(FakeTransport::new(InboundChannels { control, data }))
}

/// A tags path that never resolves to a real file; equivalent to an empty
/// tags file for every test that isn't exercising the merge itself.
fn no_tags_path() -> PathBuf {
    PathBuf::from("/nonexistent/tags.toml")
}

#[tokio::test]
async fn registration_burst_produces_a_single_advertisement() {
    let (dispatchers_tx, dispatchers_rx) = mpsc::channel(1);
    let registry = Registry::spawn(dispatchers_tx);
    let transport = fake_transport();

    // Register before the advertiser starts draining: with a size-1
    // channel every token past the first is dropped (channel full),
    // exactly the "N registrations collapse to one token" behaviour.
    for i in 0..5 {
        registry
            .register(WorkerRecord::new(Handler::new(format!("handler-{i}")), i, "addr", false, FeatureMap::new()))
            .await;
    }

    let advertiser = tokio::spawn(run(dispatchers_rx, registry.clone(), transport.clone(), no_tags_path()));
    tokio::time::sleep(Duration::from_millis(100)).await;
    drop(registry);
    let _ = tokio::time::timeout(Duration::from_millis(50), advertiser).await;

    assert_eq!(transport.published().control.len(), 1, "five registrations must coalesce into one advertisement");
}

#[tokio::test]
async fn unchanged_snapshot_is_not_republished() {
    let (dispatchers_tx, dispatchers_rx) = mpsc::channel(4);
    let registry = Registry::spawn(dispatchers_tx.clone());
    let transport = fake_transport();

    let advertiser = tokio::spawn(run(dispatchers_rx, registry.clone(), transport.clone(), no_tags_path()));

    registry
        .register(WorkerRecord::new(Handler::new("echo"), 1, "addr", false, FeatureMap::new()))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Manually push an extra token with no underlying change.
    let _ = dispatchers_tx.try_send(());
    tokio::time::sleep(Duration::from_millis(50)).await;

    drop(registry);
    drop(dispatchers_tx);
    let _ = tokio::time::timeout(Duration::from_millis(50), advertiser).await;

    assert_eq!(transport.published().control.len(), 1);
}

#[tokio::test]
async fn tags_file_content_changes_the_published_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let tags_path = dir.path().join("tags.toml");

    let (dispatchers_tx, dispatchers_rx) = mpsc::channel(4);
    let registry = Registry::spawn(dispatchers_tx.clone());
    let transport = fake_transport();

    let advertiser = tokio::spawn(run(dispatchers_rx, registry.clone(), transport.clone(), tags_path.clone()));

    registry
        .register(WorkerRecord::new(Handler::new("echo"), 1, "addr", false, FeatureMap::new()))
        .await;
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(transport.published().control.len(), 1, "registration should publish once");

    std::fs::write(&tags_path, "role = \"edge\"\n").unwrap();
    let _ = dispatchers_tx.try_send(());
    tokio::time::sleep(Duration::from_millis(50)).await;

    drop(registry);
    drop(dispatchers_tx);
    let _ = tokio::time::timeout(Duration::from_millis(50), advertiser).await;

    assert_eq!(transport.published().control.len(), 2, "a tags-file edit must trigger a republish");
}

#[test]
fn hash_snapshot_changes_with_content() {
    let mut a = DispatchersMap::new();
    a.insert(Handler::new("echo"), FeatureMap::new());
    let b = DispatchersMap::new();

    assert_ne!(hash_snapshot(&a), hash_snapshot(&b));
    assert_eq!(hash_snapshot(&a), hash_snapshot(&a.clone()));
}

#[test]
fn with_tags_merges_without_overwriting_existing_features() {
    let dir = tempfile::tempdir().unwrap();
    let tags_path = dir.path().join("tags.toml");
    std::fs::write(&tags_path, "role = \"edge\"\nregion = \"us\"\n").unwrap();

    let mut features = FeatureMap::new();
    features.insert("role".to_string(), "gateway".to_string());
    let mut snapshot = DispatchersMap::new();
    snapshot.insert(Handler::new("echo"), features);

    let merged = with_tags(snapshot, &tags_path);
    let features = merged.get(&Handler::new("echo")).unwrap();
    assert_eq!(features.get("role").map(String::as_str), Some("gateway"), "worker-declared features win over tags");
    assert_eq!(features.get("region").map(String::as_str), Some("us"));
}

#[test]
fn with_tags_is_a_no_op_when_the_file_is_missing() {
    let snapshot = {
        let mut m = DispatchersMap::new();
        m.insert(Handler::new("echo"), FeatureMap::new());
        m
    };

    let merged = with_tags(snapshot.clone(), Path::new("/nonexistent/tags.toml"));
    assert_eq!(merged, snapshot);
}
