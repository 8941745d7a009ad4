// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Save, build and restore whole steps from their [`StepMapping`].

use kickstart_app_core::{StorageBackend, StoreError};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::{MappingReport, UserDataError};
use crate::field_mapping::{FeatureFlags, FieldKind, FieldMapping, ObjectRetrievalMap, StepMapping};
use crate::form::{FormControl, FormGroup};
use crate::map_codec::map_from_value;
use crate::model::{UserDataEntry, UserDataIdentifier};
use crate::service::UserDataService;
use crate::value::{is_present, is_truthy};

/// Orchestrates [`UserDataService`] against live forms.
pub struct UserDataFormService<S> {
    user_data: UserDataService<S>,
    flags: FeatureFlags,
}

impl<S> UserDataFormService<S>
where
    S: StorageBackend,
{
    /// Create a form service.
    pub fn new(user_data: UserDataService<S>, flags: FeatureFlags) -> Self {
        Self { user_data, flags }
    }

    /// Underlying data service.
    pub fn user_data(&self) -> &UserDataService<S> {
        &self.user_data
    }

    /// Enabled feature flags.
    pub fn flags(&self) -> &FeatureFlags {
        &self.flags
    }

    /// Save every auto-saved field of a step, then bump the wizard timestamp once.
    pub fn store_from_mapping(
        &self,
        wizard: &str,
        step: &str,
        step_mapping: &StepMapping,
        form: &FormGroup,
    ) -> Result<MappingReport, StoreError> {
        let mut report = MappingReport::default();
        for mapping in step_mapping
            .field_mappings
            .iter()
            .filter(|m| m.should_auto_save(&self.flags))
        {
            let identifier = UserDataIdentifier::new(wizard, step, &mapping.name);
            report.absorb(self.store_field(&identifier, mapping, form))?;
        }
        self.user_data.update_wizard_timestamp(wizard)?;
        Ok(report)
    }

    /// Save one field according to its kind.
    pub fn store_field(
        &self,
        identifier: &UserDataIdentifier,
        mapping: &FieldMapping,
        form: &FormGroup,
    ) -> Result<(), UserDataError> {
        if mapping.has_no_dom_control {
            return self.store_field_with_no_dom_control(identifier, mapping);
        }
        match &mapping.kind {
            FieldKind::Boolean => self.store_boolean_field(identifier, form),
            FieldKind::Masked => self.store_mask_field(identifier, form),
            FieldKind::Map => {
                let value = Self::control_value(identifier, form)?;
                Ok(self.user_data.store_map(identifier, &map_from_value(value))?)
            }
            FieldKind::BackingObject(backing) => {
                // no selection yet is a legitimate state
                let selected = form.value_of(&identifier.field);
                Ok(self
                    .user_data
                    .store_backing_object(identifier, selected, backing)?)
            }
            FieldKind::Input => self.store_input_field(identifier, form),
        }
    }

    /// Save a control's value as both display and value.
    pub fn store_input_field(
        &self,
        identifier: &UserDataIdentifier,
        form: &FormGroup,
    ) -> Result<(), UserDataError> {
        let value = Self::control_value(identifier, form)?;
        Ok(self
            .user_data
            .store(identifier, UserDataEntry::plain(value.clone()))?)
    }

    /// Save a checkbox control.
    pub fn store_boolean_field(
        &self,
        identifier: &UserDataIdentifier,
        form: &FormGroup,
    ) -> Result<(), UserDataError> {
        let value = Self::control_value(identifier, form)?;
        let checked = value.as_bool().unwrap_or_else(|| is_truthy(value));
        Ok(self.user_data.store_boolean(identifier, checked)?)
    }

    /// Save only the presence of a secret control's value.
    pub fn store_mask_field(
        &self,
        identifier: &UserDataIdentifier,
        form: &FormGroup,
    ) -> Result<(), UserDataError> {
        let value = Self::control_value(identifier, form)?;
        Ok(self.user_data.store_mask(identifier, value)?)
    }

    /// Add a control for every buildable field; push stored values into the
    /// restorers of fields without a control.
    pub fn build_form(
        &self,
        form: &mut FormGroup,
        wizard: &str,
        step: &str,
        step_mapping: &StepMapping,
        retrievers: &ObjectRetrievalMap,
    ) -> Result<MappingReport, StoreError> {
        let mut report = MappingReport::default();
        for mapping in &step_mapping.field_mappings {
            if mapping.should_build_field(&self.flags) {
                if let Err(err) = mapping.validate(step) {
                    report.note(err);
                }
                let initial = match self.initial_value(wizard, step, mapping, retrievers) {
                    Ok(value) => value,
                    Err(UserDataError::Store(e)) => return Err(e),
                    Err(err) => {
                        report.note(err);
                        mapping.fallback_value()
                    }
                };
                form.add_control(
                    &mapping.name,
                    FormControl::new(initial)
                        .with_required(mapping.required)
                        .with_validators(mapping.validators.clone()),
                );
            } else if mapping.has_no_dom_control {
                report.absorb(self.restore_no_dom_field(wizard, step, mapping, retrievers))?;
            }
        }
        Ok(report)
    }

    /// Restore stored values onto an existing form.
    ///
    /// Primary triggers go last because their change handlers read the other
    /// fields. Masked fields are re-saved right after restore so any literal
    /// secret left in storage is overwritten by the mask sentinel.
    pub fn restore_form(
        &self,
        wizard: &str,
        step: &str,
        form: &mut FormGroup,
        step_mapping: &StepMapping,
        retrievers: &ObjectRetrievalMap,
    ) -> Result<MappingReport, StoreError> {
        let mut report = MappingReport::default();
        for mapping in step_mapping.mappings_to_restore(&self.flags) {
            let identifier = UserDataIdentifier::new(wizard, step, &mapping.name);
            let restored = self.restore_field(&identifier, mapping, form, retrievers);
            let rescrub = restored.is_ok()
                && mapping.kind == FieldKind::Masked
                && !mapping.has_no_dom_control
                && form.control(&mapping.name).is_some();
            report.absorb(restored)?;
            if rescrub {
                report.absorb(self.store_mask_field(&identifier, form))?;
            }
        }
        for mapping in step_mapping.primary_trigger_mappings_to_restore(&self.flags) {
            let identifier = UserDataIdentifier::new(wizard, step, &mapping.name);
            report.absorb(self.restore_field(&identifier, mapping, form, retrievers))?;
        }
        Ok(report)
    }

    /// Restore one field. A restorer, when present, takes precedence over the control.
    pub fn restore_field(
        &self,
        identifier: &UserDataIdentifier,
        mapping: &FieldMapping,
        form: &mut FormGroup,
        retrievers: &ObjectRetrievalMap,
    ) -> Result<(), UserDataError> {
        let stored = self.user_data.retrieve_stored_value(
            &identifier.wizard,
            &identifier.step,
            mapping,
            retrievers.get(&mapping.name),
        )?;
        let Some(stored) = stored.filter(|v| !v.is_null()) else {
            return Ok(());
        };
        if mapping.display_only {
            return Ok(());
        }
        if let Some(restorer) = &mapping.restorer {
            restorer(stored);
            return Ok(());
        }
        if !form.set_value(&identifier.field, stored) {
            error!(field = %identifier, "restore_field(): no DOM control");
            return Err(UserDataError::MissingControl(identifier.clone()));
        }
        Ok(())
    }

    /// Names of labelled fields that have stored data, in mapping order.
    pub fn labeled_fields_with_stored_data(
        &self,
        wizard: &str,
        step: &str,
        step_mapping: &StepMapping,
    ) -> Result<Vec<String>, StoreError> {
        let mut result = Vec::new();
        for mapping in step_mapping.field_mappings.iter().filter(|m| m.label.is_some()) {
            let identifier = UserDataIdentifier::new(wizard, step, &mapping.name);
            if self.user_data.has_stored_data(&identifier)? {
                result.push(mapping.name.clone());
            }
        }
        Ok(result)
    }

    fn store_field_with_no_dom_control(
        &self,
        identifier: &UserDataIdentifier,
        mapping: &FieldMapping,
    ) -> Result<(), UserDataError> {
        let Some(retriever) = &mapping.retriever else {
            error!(field = %identifier, "field has no DOM control, but no retriever provided");
            return Err(UserDataError::MissingRetriever {
                field: mapping.name.clone(),
            });
        };
        let value = retriever();
        match &mapping.kind {
            FieldKind::Boolean => self.user_data.store_boolean(identifier, is_truthy(&value))?,
            FieldKind::Map => self.user_data.store_map(identifier, &map_from_value(&value))?,
            FieldKind::Masked => self.user_data.store_mask(identifier, &value)?,
            FieldKind::BackingObject(backing) => {
                self.user_data
                    .store_backing_object(identifier, Some(&value), backing)?;
            }
            FieldKind::Input => self.user_data.store(identifier, UserDataEntry::plain(value))?,
        }
        Ok(())
    }

    fn restore_no_dom_field(
        &self,
        wizard: &str,
        step: &str,
        mapping: &FieldMapping,
        retrievers: &ObjectRetrievalMap,
    ) -> Result<(), UserDataError> {
        let Some(restorer) = &mapping.restorer else {
            error!(field = %mapping.name, "field has no DOM control, but no restorer was provided");
            return Err(UserDataError::MissingRestorer {
                field: mapping.name.clone(),
            });
        };
        let stored =
            self.user_data
                .retrieve_stored_value(wizard, step, mapping, retrievers.get(&mapping.name))?;
        if let Some(value) = stored {
            restorer(value);
        }
        Ok(())
    }

    // Stored value if the field may start from it and it holds data, else the
    // declared default, else the blank value for the kind.
    fn initial_value(
        &self,
        wizard: &str,
        step: &str,
        mapping: &FieldMapping,
        retrievers: &ObjectRetrievalMap,
    ) -> Result<Value, UserDataError> {
        let identifier = UserDataIdentifier::new(wizard, step, &mapping.name);
        // an empty stored map decodes to `{}`, so presence is judged on the raw entry
        if mapping.should_initialize_with_stored_value()
            && self.user_data.has_stored_data(&identifier)?
        {
            let stored = self.user_data.retrieve_stored_value(
                wizard,
                step,
                mapping,
                retrievers.get(&mapping.name),
            )?;
            if let Some(value) = stored.filter(is_present) {
                debug!(field = %mapping.name, "initializing control from stored value");
                return Ok(value);
            }
        }
        Ok(mapping.fallback_value())
    }

    fn control_value<'f>(
        identifier: &UserDataIdentifier,
        form: &'f FormGroup,
    ) -> Result<&'f Value, UserDataError> {
        form.value_of(&identifier.field).ok_or_else(|| {
            error!(field = %identifier, "form group has no control for field");
            UserDataError::MissingControl(identifier.clone())
        })
    }
}
