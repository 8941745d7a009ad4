// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-form display metadata, the step navigator list and the resume prompt timestamp.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{is_stale, Clock, StalenessPolicy};
use crate::config::{StorageBackend, StoreError};
use crate::prefs::KickstartPrefs;
use crate::store::PersistentStore;

/// Reserved key for the ordered step navigator list.
pub const STEP_LIST: &str = "TKG_KICKSTART_STEP_LIST";
/// Reserved key for the list of touched form names.
pub const FORM_LIST: &str = "TKG_KICKSTART_FORM_LIST";
/// Reserved key for the last time any metadata was saved (epoch millis).
pub const LAST_SAVED_TIMESTAMP: &str = "TKG_KICKSTART_DATA_LAST_SAVED_TIMESTAMP";

/// Label and display value of one field, as shown on a summary page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormMetaData {
    /// Human readable field label.
    pub label: String,
    /// Value as displayed to the user.
    pub display_value: String,
    /// Underlying key for listboxes whose label differs from their value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// One entry of the step navigator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDescriptor {
    /// Step title.
    pub title: String,
    /// Step description.
    pub description: String,
}

/// Field metadata keyed by field name.
pub type FormMetaDataMap = BTreeMap<String, FormMetaData>;

/// Metadata store built on a [`PersistentStore`].
pub struct FormMetaDataStore<S> {
    store: PersistentStore<S>,
    clock: Arc<dyn Clock>,
    stale_after_minutes: u64,
}

fn metadata_key(form_name: &str) -> String {
    format!("{form_name}_metadata")
}

fn data_key(form_name: &str) -> String {
    format!("{form_name}_data")
}

impl<S> FormMetaDataStore<S>
where
    S: StorageBackend,
{
    /// Create a metadata store.
    pub fn new(store: PersistentStore<S>, clock: Arc<dyn Clock>, prefs: &KickstartPrefs) -> Self {
        Self {
            store,
            clock,
            stale_after_minutes: prefs.stale_after_minutes,
        }
    }

    /// All field metadata for `form_name` (empty when none saved).
    pub fn get_meta_data(&self, form_name: &str) -> Result<FormMetaDataMap, StoreError> {
        Ok(self
            .store
            .get_item(&metadata_key(form_name))?
            .unwrap_or_default())
    }

    /// Replace all field metadata for `form_name`.
    pub fn set_meta_data(&self, form_name: &str, data: &FormMetaDataMap) -> Result<(), StoreError> {
        self.store.set_item(&metadata_key(form_name), data)?;
        self.update_last_saved_timestamp()
    }

    /// Save one field's metadata, keeping the others.
    pub fn save_meta_data_entry(
        &self,
        form_name: &str,
        field: &str,
        entry: FormMetaData,
    ) -> Result<(), StoreError> {
        self.store
            .update_item(&metadata_key(form_name), |data: Option<FormMetaDataMap>| {
                let mut data = data.unwrap_or_default();
                data.insert(field.to_owned(), entry);
                Some(data)
            })?;
        self.update_last_saved_timestamp()
    }

    /// Delete one field's metadata.
    pub fn delete_meta_data_entry(&self, form_name: &str, field: &str) -> Result<(), StoreError> {
        self.store
            .update_item(&metadata_key(form_name), |data: Option<FormMetaDataMap>| {
                let mut data = data.unwrap_or_default();
                data.remove(field);
                Some(data)
            })?;
        self.update_last_saved_timestamp()
    }

    /// Raw snapshot of a form's values, if one was saved.
    pub fn get_form_data(&self, form_name: &str) -> Result<Option<serde_json::Value>, StoreError> {
        self.store.get_item(&data_key(form_name))
    }

    /// Save a raw snapshot of a form's values.
    pub fn set_form_data(&self, form_name: &str, data: &serde_json::Value) -> Result<(), StoreError> {
        self.store.set_item(&data_key(form_name), data)?;
        self.update_last_saved_timestamp()
    }

    /// Ordered step navigator entries.
    pub fn get_step_list(&self) -> Result<Vec<StepDescriptor>, StoreError> {
        Ok(self.store.get_item(STEP_LIST)?.unwrap_or_default())
    }

    /// Replace the step navigator entries.
    pub fn set_step_list(&self, steps: &[StepDescriptor]) -> Result<(), StoreError> {
        self.store.set_item(STEP_LIST, steps)
    }

    /// Empty the step navigator list.
    pub fn reset_step_list(&self) -> Result<(), StoreError> {
        self.set_step_list(&[])
    }

    /// Names of every form that registered itself.
    pub fn get_form_list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.store.get_item(FORM_LIST)?.unwrap_or_default())
    }

    /// Append `form_name` to the form list unless already present.
    pub fn update_form_list(&self, form_name: &str) -> Result<(), StoreError> {
        self.store.update_item(FORM_LIST, |forms: Option<Vec<String>>| {
            let mut forms = forms.unwrap_or_default();
            if forms.iter().any(|f| f == form_name) {
                return None;
            }
            forms.push(form_name.to_owned());
            Some(forms)
        })?;
        Ok(())
    }

    /// Empty the form list.
    pub fn reset_form_list(&self) -> Result<(), StoreError> {
        self.store.set_item(FORM_LIST, &Vec::<String>::new())
    }

    /// Last time metadata was saved, in epoch milliseconds.
    pub fn last_saved_timestamp(&self) -> Result<Option<i64>, StoreError> {
        self.store.get_item(LAST_SAVED_TIMESTAMP)
    }

    /// Stamp the current time as the last save.
    pub fn update_last_saved_timestamp(&self) -> Result<(), StoreError> {
        self.store
            .set_item(LAST_SAVED_TIMESTAMP, &self.clock.now_millis())
    }

    /// Whether the user should be offered to discard an old session.
    ///
    /// Never prompts when nothing was ever saved.
    pub fn should_prompt_clear_local_storage(&self) -> Result<bool, StoreError> {
        Ok(is_stale(
            self.last_saved_timestamp()?,
            self.clock.now_millis(),
            self.stale_after_minutes,
            StalenessPolicy::MissingIsFresh,
        ))
    }

    /// Clear everything the persistent store wrote and restart the save clock.
    pub fn delete_all_saved_data(&self) -> Result<(), StoreError> {
        self.store.clear()?;
        self.update_last_saved_timestamp()
    }
}
