// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimal form model: named controls holding JSON values.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::value::is_truthy;

/// One control of a form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormControl {
    value: Value,
    required: bool,
    validators: Vec<String>,
}

impl FormControl {
    /// Control holding `value`.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            required: false,
            validators: Vec::new(),
        }
    }

    /// Mark the control as required.
    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Attach validator names.
    pub fn with_validators(mut self, validators: Vec<String>) -> Self {
        self.validators = validators;
        self
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Replace the value.
    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    /// Whether the control is required.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Attached validator names.
    pub fn validators(&self) -> &[String] {
        &self.validators
    }

    /// A required control must hold a truthy value (booleans excepted).
    pub fn satisfies_required(&self) -> bool {
        !self.required || self.value.is_boolean() || is_truthy(&self.value)
    }
}

/// Named controls of one step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormGroup {
    controls: BTreeMap<String, FormControl>,
}

impl FormGroup {
    /// Empty form.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a control.
    pub fn add_control(&mut self, name: impl Into<String>, control: FormControl) {
        self.controls.insert(name.into(), control);
    }

    /// Builder-style [`FormGroup::add_control`] for a bare value.
    pub fn with_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.add_control(name, FormControl::new(value));
        self
    }

    /// Control named `name`.
    pub fn control(&self, name: &str) -> Option<&FormControl> {
        self.controls.get(name)
    }

    /// Value of control `name`.
    pub fn value_of(&self, name: &str) -> Option<&Value> {
        self.controls.get(name).map(FormControl::value)
    }

    /// Set the value of an existing control. Returns `false` when there is no such control.
    pub fn set_value(&mut self, name: &str, value: Value) -> bool {
        match self.controls.get_mut(name) {
            Some(control) => {
                control.set_value(value);
                true
            }
            None => false,
        }
    }

    /// Control names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controls.keys().map(String::as_str)
    }

    /// Every required control holds a value.
    pub fn is_valid(&self) -> bool {
        self.controls.values().all(FormControl::satisfies_required)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_value_requires_existing_control() {
        let mut form = FormGroup::new().with_value("name", json!(""));
        assert!(form.set_value("name", json!("mgmt")));
        assert!(!form.set_value("missing", json!(1)));
        assert_eq!(form.value_of("name"), Some(&json!("mgmt")));
    }

    #[test]
    fn required_controls_need_values() {
        let mut form = FormGroup::new();
        form.add_control("host", FormControl::new(json!("")).with_required(true));
        form.add_control("ceip", FormControl::new(json!(false)).with_required(true));
        assert!(!form.is_valid());
        form.set_value("host", json!("vc.local"));
        assert!(form.is_valid());
    }
}
