// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared storage services for the Kickstart wizard (durable store, form metadata, prefs).
//! Keeps backends pluggable so the same logic runs over files or in-memory fakes.

pub mod clock;
pub mod config;
pub mod metadata;
pub mod prefs;
pub mod store;

pub use clock::{is_stale, Clock, StalenessPolicy, SystemClock};
pub use config::{ConfigService, StorageBackend, StoreError};
pub use metadata::{FormMetaData, FormMetaDataMap, FormMetaDataStore, StepDescriptor};
pub use prefs::KickstartPrefs;
pub use store::PersistentStore;
