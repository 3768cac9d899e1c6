// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ygg-core: data model shared by the dispatcher and its adapters.

pub mod clock;
pub mod control;
pub mod id;
pub mod message;
pub mod worker;

pub use clock::{Clock, FakeClock, SystemClock};
pub use control::{ControlCommand, ControlEvent};
pub use id::{Handler, IdGen, MessageId, UuidIdGen};
pub use message::{InboundData, OutboundData};
pub use worker::{DispatchersMap, FeatureMap, ProcessState, WorkerRecord};
