// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tags Watcher (C8): watches a single file for close-after-write or
//! delete events, triggering a single advertisement token per change.

use std::path::Path;

use notify::RecursiveMode;

use crate::error::WatchError;
use crate::fs_watch::FsWatcher;

fn classify(event: notify::Event) -> Option<()> {
    use notify::EventKind;
    match event.kind {
        EventKind::Modify(notify::event::ModifyKind::Data(_))
        | EventKind::Modify(notify::event::ModifyKind::Any)
        | EventKind::Remove(_) => Some(()),
        _ => None,
    }
}

pub struct TagsWatcher {
    inner: FsWatcher<()>,
}

impl TagsWatcher {
    pub fn watch(path: &Path) -> Result<Self, WatchError> {
        let inner = FsWatcher::watch(path, RecursiveMode::NonRecursive, classify)?;
        Ok(Self { inner })
    }

    /// Resolve to a single `()` token each time the tags file changes.
    pub async fn recv(&mut self) -> Option<()> {
        self.inner.recv().await
    }
}

#[cfg(test)]
#[path = "tags_watch_tests.rs"]
mod tests;
