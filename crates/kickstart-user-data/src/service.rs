// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-field wizard data stored as `{display, value}` entries.
//!
//! Every call reads the wizard tree fresh from the store and writes it back;
//! nothing is cached between calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use kickstart_app_core::{is_stale, Clock, KickstartPrefs, PersistentStore, StalenessPolicy};
use kickstart_app_core::{StorageBackend, StoreError};
use serde_json::Value;
use tracing::{error, warn};

use crate::error::UserDataError;
use crate::field_mapping::{BackingObjectMap, FieldKind, FieldMapping, ObjectRetriever};
use crate::map_codec::{decode_map, encode_map, map_to_value};
use crate::model::{UserDataEntry, UserDataIdentifier, UserDataWizard};
use crate::value::{display_of, is_present, is_truthy};

/// Display text stored for a secret that has a value.
pub const MASK: &str = "********";

/// Store key for a wizard's tree.
pub fn wizard_key(wizard: &str) -> String {
    format!("{wizard}Storage")
}

/// Reads and writes wizard data trees.
pub struct UserDataService<S> {
    store: PersistentStore<S>,
    clock: Arc<dyn Clock>,
    stale_after_minutes: u64,
}

impl<S: Clone> Clone for UserDataService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            clock: Arc::clone(&self.clock),
            stale_after_minutes: self.stale_after_minutes,
        }
    }
}

impl<S> UserDataService<S>
where
    S: StorageBackend,
{
    /// Create a service over `store`.
    pub fn new(store: PersistentStore<S>, clock: Arc<dyn Clock>, prefs: &KickstartPrefs) -> Self {
        Self {
            store,
            clock,
            stale_after_minutes: prefs.stale_after_minutes,
        }
    }

    /// Store `entry` at `identifier`, creating wizard and step nodes as needed.
    pub fn store(&self, identifier: &UserDataIdentifier, entry: UserDataEntry) -> Result<(), StoreError> {
        self.update_wizard(&identifier.wizard, |w| {
            w.step_mut(&identifier.step)
                .fields
                .insert(identifier.field.clone(), Some(entry));
        })
    }

    /// Store a checkbox value; display is `yes` or `no`.
    pub fn store_boolean(&self, identifier: &UserDataIdentifier, value: bool) -> Result<(), StoreError> {
        let display = if value { "yes" } else { "no" };
        self.store(identifier, UserDataEntry::new(display, Value::Bool(value)))
    }

    /// Store the presence of a secret without the secret itself.
    pub fn store_mask(&self, identifier: &UserDataIdentifier, secret: &Value) -> Result<(), StoreError> {
        let display = if is_truthy(secret) { MASK } else { "" };
        self.store(identifier, UserDataEntry::new(display, Value::String(String::new())))
    }

    /// Store a string map in the `k:v, k:v` encoding (display and value alike).
    pub fn store_map(
        &self,
        identifier: &UserDataIdentifier,
        map: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        let encoded = encode_map(map);
        self.store(
            identifier,
            UserDataEntry::new(encoded.clone(), Value::String(encoded)),
        )
    }

    /// Store the display/value projection of a selected object.
    ///
    /// `None` (or null) means nothing is selected yet and stores empty strings.
    pub fn store_backing_object(
        &self,
        identifier: &UserDataIdentifier,
        selected: Option<&Value>,
        backing: &BackingObjectMap,
    ) -> Result<(), StoreError> {
        let entry = match selected.filter(|v| !v.is_null()) {
            None => UserDataEntry::new("", Value::String(String::new())),
            Some(obj) => {
                if !obj.is_object() {
                    warn!(field = %identifier, "backing object field holds a non-object value");
                }
                UserDataEntry::new(
                    obj.get(&backing.display_field).map(display_of).unwrap_or_default(),
                    obj.get(&backing.value_field).cloned().unwrap_or(Value::Null),
                )
            }
        };
        self.store(identifier, entry)
    }

    /// Entry at `identifier`, if one is stored and not cleared.
    pub fn retrieve(&self, identifier: &UserDataIdentifier) -> Result<Option<UserDataEntry>, StoreError> {
        let Some(wizard) = self.get_wizard_entry(&identifier.wizard)? else {
            return Ok(None);
        };
        Ok(wizard
            .steps
            .get(&identifier.step)
            .and_then(|step| step.fields.get(&identifier.field))
            .cloned()
            .flatten())
    }

    /// Map stored at `identifier`, parsed back from its encoding.
    pub fn retrieve_map(
        &self,
        identifier: &UserDataIdentifier,
    ) -> Result<Option<BTreeMap<String, String>>, StoreError> {
        Ok(self.retrieve(identifier)?.map(|entry| {
            entry
                .value
                .as_str()
                .map_or_else(|| decode_map(&entry.display), decode_map)
        }))
    }

    /// Stored value of a field, converted back to what its control expects.
    ///
    /// Maps come back as JSON objects; backing objects are looked up with
    /// `retriever` from the persisted key.
    pub fn retrieve_stored_value(
        &self,
        wizard: &str,
        step: &str,
        mapping: &FieldMapping,
        retriever: Option<&ObjectRetriever>,
    ) -> Result<Option<Value>, UserDataError> {
        let identifier = UserDataIdentifier::new(wizard, step, &mapping.name);
        let Some(entry) = self.retrieve(&identifier)? else {
            return Ok(None);
        };
        match &mapping.kind {
            FieldKind::Map => {
                let encoded = entry.value.as_str().unwrap_or(&entry.display);
                Ok(Some(map_to_value(decode_map(encoded))))
            }
            FieldKind::BackingObject(_) => {
                if !is_present(&entry.value) {
                    return Ok(None);
                }
                let Some(retriever) = retriever else {
                    error!(field = %identifier, "unable to retrieve backing object: no retriever");
                    return Err(UserDataError::MissingRetriever {
                        field: mapping.name.clone(),
                    });
                };
                let object = retriever(&entry.value);
                if object.is_none() {
                    warn!(field = %identifier, key = %entry.value, "retriever found no object for stored key");
                }
                Ok(object)
            }
            FieldKind::Input | FieldKind::Boolean | FieldKind::Masked => Ok(Some(entry.value)),
        }
    }

    /// A value is stored and is neither null nor `""`. `false` counts as data.
    pub fn has_stored_data(&self, identifier: &UserDataIdentifier) -> Result<bool, StoreError> {
        Ok(self
            .retrieve(identifier)?
            .is_some_and(|entry| is_present(&entry.value)))
    }

    /// The step node exists for `wizard`.
    pub fn has_stored_step_data(&self, wizard: &str, step: &str) -> Result<bool, StoreError> {
        Ok(self
            .get_wizard_entry(wizard)?
            .is_some_and(|w| w.steps.contains_key(step)))
    }

    /// Mark the field as cleared. No-op unless the step already exists.
    pub fn clear(&self, identifier: &UserDataIdentifier) -> Result<(), StoreError> {
        self.store
            .update_item(&wizard_key(&identifier.wizard), |entry: Option<UserDataWizard>| {
                let mut wizard = entry?;
                wizard
                    .steps
                    .get_mut(&identifier.step)?
                    .fields
                    .insert(identifier.field.clone(), None);
                Some(wizard)
            })?;
        Ok(())
    }

    /// Remove the field from its step.
    pub fn delete(&self, identifier: &UserDataIdentifier) -> Result<(), StoreError> {
        self.store
            .update_item(&wizard_key(&identifier.wizard), |entry: Option<UserDataWizard>| {
                let mut wizard = entry?;
                wizard
                    .steps
                    .get_mut(&identifier.step)?
                    .fields
                    .remove(&identifier.field)?;
                Some(wizard)
            })?;
        Ok(())
    }

    /// Drop everything stored for `wizard`. Only for an explicit user request.
    pub fn delete_wizard_data(&self, wizard: &str) -> Result<(), StoreError> {
        self.store.remove_item(&wizard_key(wizard))
    }

    /// The wizard's tree, or an empty one when nothing is stored.
    pub fn retrieve_wizard_entry(&self, wizard: &str) -> Result<UserDataWizard, StoreError> {
        self.ensure_wizard_entry(wizard)
    }

    /// Set the step order of the confirmation page.
    pub fn store_wizard_display_order(&self, wizard: &str, order: Vec<String>) -> Result<(), StoreError> {
        self.update_wizard(wizard, |w| w.display_order = Some(order))
    }

    /// Set step titles.
    pub fn store_wizard_titles(
        &self,
        wizard: &str,
        titles: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.update_wizard(wizard, |w| w.titles = Some(titles))
    }

    /// Set step descriptions.
    pub fn store_wizard_descriptions(
        &self,
        wizard: &str,
        descriptions: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.update_wizard(wizard, |w| w.descriptions = Some(descriptions))
    }

    /// Set the field order of one step.
    pub fn store_step_display_order(
        &self,
        wizard: &str,
        step: &str,
        order: Vec<String>,
    ) -> Result<(), StoreError> {
        self.update_wizard(wizard, |w| w.step_mut(step).display_order = Some(order))
    }

    /// Set the field labels of one step.
    pub fn store_step_labels(
        &self,
        wizard: &str,
        step: &str,
        labels: BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.update_wizard(wizard, |w| w.step_mut(step).labels = Some(labels))
    }

    /// Whether stored data should be treated as left over from an old session.
    ///
    /// No data is never old; data without a timestamp always is.
    pub fn is_wizard_data_old(&self, wizard: &str) -> Result<bool, StoreError> {
        let Some(entry) = self.get_wizard_entry(wizard)? else {
            return Ok(false);
        };
        Ok(is_stale(
            entry.last_update,
            self.clock.now_millis(),
            self.stale_after_minutes,
            StalenessPolicy::MissingIsStale,
        ))
    }

    /// Mark the wizard's data as current.
    ///
    /// Called after a full step save or an explicit resume, never per field,
    /// so a half-abandoned draft keeps its old timestamp.
    pub fn update_wizard_timestamp(&self, wizard: &str) -> Result<(), StoreError> {
        let now = self.clock.now_millis();
        self.update_wizard(wizard, |w| w.last_update = Some(now))
    }

    // Read-modify-write of the whole tree under the store's write lock.
    fn update_wizard(
        &self,
        wizard: &str,
        f: impl FnOnce(&mut UserDataWizard),
    ) -> Result<(), StoreError> {
        self.store
            .update_item(&wizard_key(wizard), |entry: Option<UserDataWizard>| {
                let mut entry = entry.unwrap_or_else(|| UserDataWizard::new(wizard));
                f(&mut entry);
                Some(entry)
            })?;
        Ok(())
    }

    fn get_wizard_entry(&self, wizard: &str) -> Result<Option<UserDataWizard>, StoreError> {
        self.store.get_item(&wizard_key(wizard))
    }

    fn ensure_wizard_entry(&self, wizard: &str) -> Result<UserDataWizard, StoreError> {
        Ok(self
            .get_wizard_entry(wizard)?
            .unwrap_or_else(|| UserDataWizard::new(wizard)))
    }
}
