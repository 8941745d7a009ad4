// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tunable settings for the Kickstart wizard state services.

use serde::{Deserialize, Serialize};

/// Key under which [`KickstartPrefs`] are persisted through a `ConfigService`.
pub const PREFS_KEY: &str = "kickstart_prefs";

/// Minutes after which saved wizard data is considered old.
pub const DEFAULT_STALE_AFTER_MINUTES: u64 = 30;

/// Saved preferences for the wizard state services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KickstartPrefs {
    /// Staleness threshold used by both the resume prompt and per-wizard checks.
    pub stale_after_minutes: u64,
}

impl Default for KickstartPrefs {
    fn default() -> Self {
        Self {
            stale_after_minutes: DEFAULT_STALE_AFTER_MINUTES,
        }
    }
}
