// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared file-system watching primitive backing C2 (worker directory) and
//! C8 (tags file): watch a path, run each raw `notify::Event` through a
//! caller-supplied filter, and deliver the typed result over a channel.

use std::path::{Path, PathBuf};

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;

/// A live watch on one path. Dropping it stops the underlying OS watch.
pub struct FsWatcher<T> {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<T>,
}

impl<T: Send + 'static> FsWatcher<T> {
    /// Watch `path`, running every raw filesystem event through `filter`.
    /// Events for which `filter` returns `None` are dropped silently.
    pub fn watch<F>(path: &Path, mode: RecursiveMode, filter: F) -> Result<Self, WatchError>
    where
        F: Fn(notify::Event) -> Option<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(32);
        let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                if let Some(item) = filter(event) {
                    let _ = tx.blocking_send(item);
                }
            }
        })
        .map_err(|source| WatchError::Watch { path: path.to_path_buf(), source })?;

        watcher
            .watch(path, mode)
            .map_err(|source| WatchError::Watch { path: path.to_path_buf(), source })?;

        Ok(Self { _watcher: watcher, rx })
    }

    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }
}

pub(crate) fn event_paths(event: &notify::Event) -> impl Iterator<Item = &PathBuf> {
    event.paths.iter()
}

#[cfg(test)]
#[path = "fs_watch_tests.rs"]
mod tests;
