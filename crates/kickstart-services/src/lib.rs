// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One context value owning every wizard state service.
//!
//! Built per session (or per test) and passed around explicitly; nothing is
//! held in process-wide statics.

use std::sync::Arc;

use kickstart_app_core::prefs::PREFS_KEY;
use kickstart_app_core::{
    Clock, ConfigService, FormMetaDataStore, KickstartPrefs, PersistentStore, StorageBackend,
    StoreError,
};
use kickstart_registrar::{DataServiceRegistrar, Messenger};
use kickstart_user_data::{FeatureFlags, UserDataFormService, UserDataService};
use tracing::{debug, warn};

/// The wizard's services, sharing one storage backend and one event bus.
pub struct AppServices<S> {
    config: ConfigService<S>,
    prefs: KickstartPrefs,
    store: PersistentStore<S>,
    metadata: FormMetaDataStore<S>,
    form: UserDataFormService<S>,
    messenger: Messenger,
    registrar: DataServiceRegistrar,
}

impl<S> AppServices<S>
where
    S: StorageBackend + Clone,
{
    /// Wire every service over `backend` with explicit prefs.
    pub fn new(
        backend: S,
        clock: Arc<dyn Clock>,
        prefs: KickstartPrefs,
        flags: FeatureFlags,
    ) -> Self {
        let store = PersistentStore::new(backend.clone());
        let metadata = FormMetaDataStore::new(store.clone(), Arc::clone(&clock), &prefs);
        let user_data = UserDataService::new(store.clone(), clock, &prefs);
        let messenger = Messenger::new();
        Self {
            config: ConfigService::new(backend),
            prefs,
            store,
            metadata,
            form: UserDataFormService::new(user_data, flags),
            registrar: DataServiceRegistrar::new(messenger.clone()),
            messenger,
        }
    }

    /// Like [`AppServices::new`], reading prefs from `backend` (best-effort).
    ///
    /// Unreadable prefs fall back to defaults; defaults are persisted when
    /// nothing was stored yet.
    pub fn load(backend: S, clock: Arc<dyn Clock>, flags: FeatureFlags) -> Self {
        let config = ConfigService::new(backend.clone());
        let prefs = match config.load::<KickstartPrefs>(PREFS_KEY) {
            Ok(Some(prefs)) => prefs,
            Ok(None) => {
                let prefs = KickstartPrefs::default();
                if let Err(err) = config.save(PREFS_KEY, &prefs) {
                    warn!(%err, "could not persist default prefs");
                }
                prefs
            }
            Err(err) => {
                warn!(%err, "unreadable prefs; using defaults");
                KickstartPrefs::default()
            }
        };
        debug!(stale_after_minutes = prefs.stale_after_minutes, "prefs loaded");
        Self::new(backend, clock, prefs, flags)
    }

    /// Prefs the services were built with.
    pub fn prefs(&self) -> &KickstartPrefs {
        &self.prefs
    }

    /// Persist `prefs`; they take effect the next time the services are loaded.
    pub fn save_prefs(&self, prefs: &KickstartPrefs) -> Result<(), StoreError> {
        self.config.save(PREFS_KEY, prefs)
    }

    /// Typed prefs access over the shared backend.
    pub fn config(&self) -> &ConfigService<S> {
        &self.config
    }

    /// Durable key-value store.
    pub fn store(&self) -> &PersistentStore<S> {
        &self.store
    }

    /// Form metadata store.
    pub fn metadata(&self) -> &FormMetaDataStore<S> {
        &self.metadata
    }

    /// Per-field wizard data.
    pub fn user_data(&self) -> &UserDataService<S> {
        self.form.user_data()
    }

    /// Whole-step save/build/restore.
    pub fn form_service(&self) -> &UserDataFormService<S> {
        &self.form
    }

    /// Event bus.
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Event → fetcher registry.
    pub fn registrar(&self) -> &DataServiceRegistrar {
        &self.registrar
    }

    /// Drop every saved form and wizard tree. Prefs are kept.
    pub fn delete_all_saved_data(&self) -> Result<(), StoreError> {
        self.metadata.delete_all_saved_data()
    }
}
