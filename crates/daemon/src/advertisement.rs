// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advertisement Engine (C6): hash-dedupes dispatchers-map snapshots and
//! publishes connection-status updates upstream (`spec.md` §4.6).
//!
//! Registration bursts at startup (N registrations) collapse into a
//! single token on the size-1 `dispatchers` channel owned by the
//! registry, and a burst of tokens here collapses into a single
//! publish when the underlying snapshot hasn't changed since the last
//! one — "worker registration bursts at startup ... must produce one
//! advertisement, not N."

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tracing::warn;
use ygg_core::{ControlEvent, DispatchersMap, FeatureMap};
use ygg_transport::Transport;

use crate::registry::Registry;

/// Consume `dispatchers` tokens until the channel closes, publishing a
/// `ConnectionStatus` event whenever the merged snapshot's content hash
/// changes. `tags_path` is folded into every worker's feature map before
/// hashing (`spec.md` §4.8: "the tags are included in the feature mapping
/// snapshot") so a tags-only edit is visible in, and can itself trigger,
/// the republished advertisement.
pub async fn run(mut dispatchers: mpsc::Receiver<()>, registry: Registry, transport: Arc<dyn Transport>, tags_path: PathBuf) {
    let mut last_hash: Option<String> = None;

    while dispatchers.recv().await.is_some() {
        let snapshot = with_tags(registry.snapshot().await, &tags_path);
        let hash = hash_snapshot(&snapshot);
        if last_hash.as_deref() == Some(hash.as_str()) {
            continue;
        }

        if let Err(e) = transport.send_control(ControlEvent::connection_status(snapshot)).await {
            warn!(error = %e, "failed to publish connection-status advertisement");
            continue;
        }
        last_hash = Some(hash);
    }
}

/// Merge the tags file's key/value pairs into every worker's feature map.
/// A missing or malformed tags file is equivalent to an empty one — tags
/// are an operator convenience, not something that should block
/// advertisement.
fn with_tags(mut snapshot: DispatchersMap, tags_path: &Path) -> DispatchersMap {
    let tags = load_tags(tags_path);
    if tags.is_empty() {
        return snapshot;
    }
    for features in snapshot.values_mut() {
        for (key, value) in &tags {
            features.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
    snapshot
}

fn load_tags(path: &Path) -> FeatureMap {
    let Ok(contents) = std::fs::read_to_string(path) else { return FeatureMap::new() };
    let Ok(table) = toml::from_str::<toml::value::Table>(&contents) else { return FeatureMap::new() };
    table
        .into_iter()
        .filter_map(|(k, v)| v.as_str().map(|s| (k, s.to_string())))
        .collect()
}

/// Hash a dispatchers-map snapshot deterministically. `DispatchersMap` is
/// a `BTreeMap`, so `serde_json` serialization already has stable key
/// order; hashing that serialization gives a stable content fingerprint.
fn hash_snapshot(snapshot: &DispatchersMap) -> String {
    let serialized = serde_json::to_vec(snapshot).unwrap_or_default();
    let digest = Sha256::digest(&serialized);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
#[path = "advertisement_tests.rs"]
mod tests;
