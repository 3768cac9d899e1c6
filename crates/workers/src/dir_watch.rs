// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker Directory Watcher (C2): watches a directory for files whose name
//! ends in `worker`, emitting `Added`/`Removed` events.

use std::path::{Path, PathBuf};

use notify::RecursiveMode;

use crate::error::WatchError;
use crate::fs_watch::{event_paths, FsWatcher};

const WORKER_SUFFIX: &str = "worker";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    WorkerExecutableAdded(PathBuf),
    WorkerExecutableRemoved(PathBuf),
}

fn is_worker_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| name.ends_with(WORKER_SUFFIX))
}

fn classify(event: notify::Event) -> Option<DirectoryEvent> {
    use notify::EventKind;
    match event.kind {
        EventKind::Create(_) => event_paths(&event)
            .find(|p| is_worker_file(p))
            .cloned()
            .map(DirectoryEvent::WorkerExecutableAdded),
        EventKind::Remove(_) => event_paths(&event)
            .find(|p| is_worker_file(p))
            .cloned()
            .map(DirectoryEvent::WorkerExecutableRemoved),
        _ => None,
    }
}

pub struct WorkerDirectoryWatcher {
    inner: FsWatcher<DirectoryEvent>,
}

impl WorkerDirectoryWatcher {
    pub fn watch(dir: &Path) -> Result<Self, WatchError> {
        let inner = FsWatcher::watch(dir, RecursiveMode::NonRecursive, classify)?;
        Ok(Self { inner })
    }

    /// Enumerate the `*worker` files currently present, for the C9 startup
    /// scan ("scan worker directory and launch one C1 per `*worker` file").
    pub fn scan(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if is_worker_file(&path) {
                found.push(path);
            }
        }
        Ok(found)
    }

    pub async fn recv(&mut self) -> Option<DirectoryEvent> {
        self.inner.recv().await
    }
}

#[cfg(test)]
#[path = "dir_watch_tests.rs"]
mod tests;
