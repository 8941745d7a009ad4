// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wall-clock port and the staleness rules built on it.

use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds in one minute.
pub const MILLIS_PER_MINUTE: i64 = 60_000;

/// Source of wall-clock time in epoch milliseconds.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// [`Clock`] backed by [`SystemTime`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

/// How a missing timestamp is interpreted when deciding whether saved data is stale.
///
/// Two call sites disagree on purpose: the resume prompt only fires when there
/// is evidence of an old save, while per-wizard data without a timestamp was
/// never completely saved and is treated as old.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StalenessPolicy {
    /// No timestamp means "nothing to prompt about".
    MissingIsFresh,
    /// No timestamp means "assume old".
    MissingIsStale,
}

/// Staleness check shared by the metadata store and the user data service.
///
/// Data is stale when strictly more than `threshold_minutes` have elapsed
/// since `last_saved`.
pub fn is_stale(
    last_saved: Option<i64>,
    now_millis: i64,
    threshold_minutes: u64,
    policy: StalenessPolicy,
) -> bool {
    let Some(last) = last_saved else {
        return policy == StalenessPolicy::MissingIsStale;
    };
    let threshold = i64::try_from(threshold_minutes)
        .unwrap_or(i64::MAX)
        .saturating_mul(MILLIS_PER_MINUTE);
    now_millis.saturating_sub(last) > threshold
}
