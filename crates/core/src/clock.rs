// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction so backoff and advertisement timing can be driven
//! deterministically in tests instead of sleeping on the wall clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A source of monotonic time, decoupled from `std::time::Instant` so tests
/// can advance it without sleeping.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Milliseconds elapsed since an arbitrary epoch fixed at clock creation.
    fn now_ms(&self) -> u64;

    fn elapsed_since(&self, earlier_ms: u64) -> Duration {
        Duration::from_millis(self.now_ms().saturating_sub(earlier_ms))
    }
}

/// Wall-clock implementation used in production.
#[derive(Clone, Default)]
pub struct SystemClock {
    start: std::sync::Arc<std::time::Instant>,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            start: std::sync::Arc::new(std::time::Instant::now()),
        }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

/// Manually-advanced clock for deterministic backoff/advertisement tests.
#[derive(Clone, Default)]
pub struct FakeClock {
    now_ms: Arc<AtomicU64>,
}

impl FakeClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.now_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_ms(&self) -> u64 {
        self.now_ms.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
