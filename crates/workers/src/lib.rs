// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ygg-workers: process supervision (C1) and filesystem watching (C2, C8)
//! for locally installed worker executables.

mod backoff;
mod dir_watch;
mod error;
mod fs_watch;
mod supervisor;
mod tags_watch;

pub use backoff::Backoff;
pub use dir_watch::{DirectoryEvent, WorkerDirectoryWatcher};
pub use error::{SupervisorError, WatchError};
pub use fs_watch::FsWatcher;
pub use supervisor::{spawn, SpawnSpec, SupervisorHandle, WorkerDied};
pub use tags_watch::TagsWatcher;
