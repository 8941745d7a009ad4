// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Declarative description of a step's fields and how each one is stored.
//!
//! A field has exactly one [`FieldKind`]; store and restore match on it
//! exhaustively. The flags on [`FieldMapping`] only decide *whether* a field is
//! built, stored or restored, never *how*.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::UserDataError;

/// Produces the current value of a field that has no form control.
pub type ValueRetriever = Arc<dyn Fn() -> Value + Send + Sync>;
/// Receives a stored value for a field that restores itself.
pub type ValueRestorer = Arc<dyn Fn(Value) + Send + Sync>;
/// Looks up a backing object from its persisted key.
pub type ObjectRetriever = Arc<dyn Fn(&Value) -> Option<Value> + Send + Sync>;
/// Backing object retrievers keyed by field name.
pub type ObjectRetrievalMap = HashMap<String, ObjectRetriever>;

/// Which projection of an object-backed field is persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackingObjectMap {
    /// Member shown on summary pages.
    pub display_field: String,
    /// Member persisted as the value and later handed to the retriever.
    pub value_field: String,
}

impl BackingObjectMap {
    /// Build a projection descriptor.
    pub fn new(display_field: impl Into<String>, value_field: impl Into<String>) -> Self {
        Self {
            display_field: display_field.into(),
            value_field: value_field.into(),
        }
    }
}

/// How a field's value is stored and restored.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum FieldKind {
    /// Plain value stored as-is.
    #[default]
    Input,
    /// Checkbox; display is `yes`/`no`.
    Boolean,
    /// Secret; only a presence sentinel is persisted.
    Masked,
    /// String map stored in the `k:v, k:v` encoding.
    Map,
    /// Object selection; only its display/value projection is persisted.
    BackingObject(BackingObjectMap),
}

/// Feature flags that are switched on for this session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureFlags {
    enabled: HashSet<String>,
}

impl FeatureFlags {
    /// No flags enabled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable `flag`.
    pub fn enable(&mut self, flag: impl Into<String>) {
        self.enabled.insert(flag.into());
    }

    /// Whether `flag` is enabled.
    pub fn is_enabled(&self, flag: &str) -> bool {
        self.enabled.contains(flag)
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureFlags {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            enabled: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Storage and restore behaviour of one form field.
#[derive(Clone, Default)]
pub struct FieldMapping {
    /// Field (and control) name.
    pub name: String,
    /// Store/restore representation.
    pub kind: FieldKind,
    /// Label used on summary pages.
    pub label: Option<String>,
    /// Value used when nothing usable is stored.
    pub default_value: Option<Value>,
    /// Field must have a value.
    pub required: bool,
    /// Names of validators to attach to the control.
    pub validators: Vec<String>,
    /// Field only exists when this flag is enabled.
    pub feature_flag: Option<String>,
    /// Field is shown but never gets a control.
    pub display_only: bool,
    /// Value lives outside the form; read with `retriever`, written with `restorer`.
    pub has_no_dom_control: bool,
    /// Skipped by batch saves.
    pub do_not_auto_save: bool,
    /// Skipped by batch restores (usually set by another field's change handler).
    pub do_not_auto_restore: bool,
    /// Restored last, after the fields its change handler reads.
    pub primary_trigger: bool,
    /// Value depends on backend data that may not have arrived yet.
    pub requires_backend_data: bool,
    /// Value is never persisted.
    pub never_store: bool,
    /// Value source for fields without a control.
    pub retriever: Option<ValueRetriever>,
    /// Value sink used instead of the control when restoring.
    pub restorer: Option<ValueRestorer>,
}

impl fmt::Debug for FieldMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldMapping")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_no_dom_control", &self.has_no_dom_control)
            .field("primary_trigger", &self.primary_trigger)
            .field("retriever", &self.retriever.is_some())
            .field("restorer", &self.restorer.is_some())
            .finish_non_exhaustive()
    }
}

impl FieldMapping {
    /// Plain input field.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Field of the given kind.
    pub fn of_kind(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            kind,
            ..Self::new(name)
        }
    }

    /// Checkbox field.
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::of_kind(name, FieldKind::Boolean)
    }

    /// Secret field.
    pub fn masked(name: impl Into<String>) -> Self {
        Self::of_kind(name, FieldKind::Masked)
    }

    /// String map field.
    pub fn map(name: impl Into<String>) -> Self {
        Self::of_kind(name, FieldKind::Map)
    }

    /// Object-backed selection.
    pub fn backing_object(
        name: impl Into<String>,
        display_field: impl Into<String>,
        value_field: impl Into<String>,
    ) -> Self {
        Self::of_kind(
            name,
            FieldKind::BackingObject(BackingObjectMap::new(display_field, value_field)),
        )
    }

    /// Set the summary label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the default value.
    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Mark as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Attach a named validator.
    pub fn with_validator(mut self, validator: impl Into<String>) -> Self {
        self.validators.push(validator.into());
        self
    }

    /// Gate the field behind a feature flag.
    pub fn with_feature_flag(mut self, flag: impl Into<String>) -> Self {
        self.feature_flag = Some(flag.into());
        self
    }

    /// Mark as display only.
    pub fn display_only(mut self) -> Self {
        self.display_only = true;
        self
    }

    /// Mark as having no form control.
    pub fn no_dom_control(mut self) -> Self {
        self.has_no_dom_control = true;
        self
    }

    /// Exclude from batch saves.
    pub fn do_not_auto_save(mut self) -> Self {
        self.do_not_auto_save = true;
        self
    }

    /// Exclude from batch restores.
    pub fn do_not_auto_restore(mut self) -> Self {
        self.do_not_auto_restore = true;
        self
    }

    /// Mark as a primary trigger.
    pub fn primary_trigger(mut self) -> Self {
        self.primary_trigger = true;
        self
    }

    /// Mark as depending on backend data.
    pub fn requires_backend_data(mut self) -> Self {
        self.requires_backend_data = true;
        self
    }

    /// Mark as never persisted.
    pub fn never_store(mut self) -> Self {
        self.never_store = true;
        self
    }

    /// Set the value source for a field without a control.
    pub fn with_retriever(mut self, retriever: impl Fn() -> Value + Send + Sync + 'static) -> Self {
        self.retriever = Some(Arc::new(retriever));
        self
    }

    /// Set the value sink used when restoring.
    pub fn with_restorer(mut self, restorer: impl Fn(Value) + Send + Sync + 'static) -> Self {
        self.restorer = Some(Arc::new(restorer));
        self
    }

    /// Control value when nothing is stored and no default is declared.
    pub fn blank_value(&self) -> Value {
        match self.kind {
            FieldKind::Boolean => Value::Bool(false),
            _ => Value::String(String::new()),
        }
    }

    /// Default value, or the blank value for the kind.
    pub fn fallback_value(&self) -> Value {
        self.default_value
            .clone()
            .unwrap_or_else(|| self.blank_value())
    }

    /// Field is not hidden behind a disabled feature flag.
    pub fn passes_feature_flag_filter(&self, flags: &FeatureFlags) -> bool {
        self.feature_flag
            .as_deref()
            .is_none_or(|flag| flags.is_enabled(flag))
    }

    /// Included in batch saves.
    pub fn should_auto_save(&self, flags: &FeatureFlags) -> bool {
        !self.do_not_auto_save && self.passes_feature_flag_filter(flags)
    }

    /// Gets a form control.
    pub fn should_build_field(&self, flags: &FeatureFlags) -> bool {
        !self.display_only && !self.has_no_dom_control && self.passes_feature_flag_filter(flags)
    }

    /// Control starts from the stored value when building the form.
    ///
    /// Primary triggers, fields filled by change handlers or backend data, and
    /// never-stored fields start from their default instead.
    pub fn should_initialize_with_stored_value(&self) -> bool {
        !self.primary_trigger
            && !self.do_not_auto_restore
            && !self.requires_backend_data
            && !self.never_store
    }

    /// Restored in the first pass of a batch restore.
    pub fn should_restore_with_stored_value(&self, flags: &FeatureFlags) -> bool {
        !self.do_not_auto_restore
            && !self.never_store
            && !self.primary_trigger
            && self.passes_feature_flag_filter(flags)
    }

    /// Reject flag combinations that cannot work.
    pub fn validate(&self, step: &str) -> Result<(), UserDataError> {
        if self.kind == FieldKind::Boolean && self.required {
            return Err(UserDataError::InvalidMapping {
                step: step.to_owned(),
                field: self.name.clone(),
                reason: "field cannot be required AND boolean".into(),
            });
        }
        Ok(())
    }
}

/// All field mappings of one step, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct StepMapping {
    /// Field mappings.
    pub field_mappings: Vec<FieldMapping>,
}

impl StepMapping {
    /// Build from a list of mappings.
    pub fn new(field_mappings: Vec<FieldMapping>) -> Self {
        Self { field_mappings }
    }

    /// Mapping for `field`, if declared.
    pub fn field_mapping(&self, field: &str) -> Option<&FieldMapping> {
        self.field_mappings.iter().find(|m| m.name == field)
    }

    /// Field name → label for every labelled field.
    pub fn field_label_map(&self) -> BTreeMap<String, String> {
        self.field_mappings
            .iter()
            .filter_map(|m| m.label.clone().map(|label| (m.name.clone(), label)))
            .collect()
    }

    /// Mappings restored in the first pass.
    pub fn mappings_to_restore<'a>(
        &'a self,
        flags: &'a FeatureFlags,
    ) -> impl Iterator<Item = &'a FieldMapping> + 'a {
        self.field_mappings
            .iter()
            .filter(move |m| m.should_restore_with_stored_value(flags))
    }

    /// Primary triggers, restored after everything else.
    pub fn primary_trigger_mappings_to_restore<'a>(
        &'a self,
        flags: &'a FeatureFlags,
    ) -> impl Iterator<Item = &'a FieldMapping> + 'a {
        self.field_mappings
            .iter()
            .filter(move |m| m.primary_trigger && m.passes_feature_flag_filter(flags))
    }
}
