// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Manually advanced clock for staleness tests.

use kickstart_app_core::clock::{Clock, MILLIS_PER_MINUTE};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Default starting instant for [`FakeClock::new`] (2023-11-14T22:13:20Z).
pub const FAKE_EPOCH_MILLIS: i64 = 1_700_000_000_000;

/// [`Clock`] whose time only moves when the test says so.
///
/// Clones share the same instant.
#[derive(Clone, Debug)]
pub struct FakeClock {
    now: Arc<AtomicI64>,
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeClock {
    /// Clock starting at [`FAKE_EPOCH_MILLIS`].
    pub fn new() -> Self {
        Self::at(FAKE_EPOCH_MILLIS)
    }

    /// Clock starting at `millis`.
    pub fn at(millis: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(millis)),
        }
    }

    /// Move time forward by `millis`.
    pub fn advance_millis(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }

    /// Move time forward by whole minutes.
    pub fn advance_minutes(&self, minutes: i64) {
        self.advance_millis(minutes * MILLIS_PER_MINUTE);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, millis: i64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for FakeClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_time() {
        let a = FakeClock::new();
        let b = a.clone();
        a.advance_minutes(2);
        assert_eq!(b.now_millis(), FAKE_EPOCH_MILLIS + 120_000);
    }
}
