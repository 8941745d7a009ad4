// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles for Kickstart crates.
#![forbid(unsafe_code)]
//!
//! # Modules
//!
//! - [`storage`] - In-memory storage backend with call counters and failure injection
//! - [`clock`] - Manually advanced clock for staleness checks

pub mod clock;
pub mod storage;

pub use clock::{FakeClock, FAKE_EPOCH_MILLIS};
pub use storage::InMemoryStorage;
