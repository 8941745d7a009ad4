// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Persisted shape of wizard data: wizard → step → field → entry.
//!
//! Field names are camelCase on the wire so data saved by earlier releases of
//! the wizard still loads.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::value::display_of;

/// One stored field: what a summary page shows and the literal control value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserDataEntry {
    /// Text shown on a confirmation page.
    pub display: String,
    /// Literal value to restore into the control.
    pub value: Value,
}

impl UserDataEntry {
    /// Entry with explicit display text.
    pub fn new(display: impl Into<String>, value: Value) -> Self {
        Self {
            display: display.into(),
            value,
        }
    }

    /// Entry whose display text is derived from the value itself.
    pub fn plain(value: Value) -> Self {
        Self {
            display: display_of(&value),
            value,
        }
    }
}

/// Address of one field: `(wizard, step, field)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserDataIdentifier {
    /// Wizard name, e.g. `vsphere`.
    pub wizard: String,
    /// Step name within the wizard.
    pub step: String,
    /// Field name within the step.
    pub field: String,
}

impl UserDataIdentifier {
    /// Build an identifier.
    pub fn new(wizard: impl Into<String>, step: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            wizard: wizard.into(),
            step: step.into(),
            field: field.into(),
        }
    }
}

impl fmt::Display for UserDataIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.wizard, self.step, self.field)
    }
}

/// Everything stored for one wizard, persisted under `"<wizard>Storage"`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataWizard {
    /// Wizard name.
    pub wizard: String,
    /// Steps keyed by step name.
    #[serde(default)]
    pub steps: BTreeMap<String, UserDataStep>,
    /// Order in which steps appear on the confirmation page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<Vec<String>>,
    /// Step titles keyed by step name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titles: Option<BTreeMap<String, String>>,
    /// Step descriptions keyed by step name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<BTreeMap<String, String>>,
    /// Epoch millis of the last full save or explicit resume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_update: Option<i64>,
}

impl UserDataWizard {
    /// Empty tree for `wizard`.
    pub fn new(wizard: impl Into<String>) -> Self {
        Self {
            wizard: wizard.into(),
            ..Self::default()
        }
    }

    /// Step node, created if missing.
    pub fn step_mut(&mut self, step: &str) -> &mut UserDataStep {
        self.steps.entry(step.to_owned()).or_default()
    }
}

/// Fields stored for one step.
///
/// A `None` field value is an explicitly cleared entry.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataStep {
    /// Stored fields keyed by field name.
    #[serde(default)]
    pub fields: BTreeMap<String, Option<UserDataEntry>>,
    /// Order in which fields appear on the confirmation page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_order: Option<Vec<String>>,
    /// Field labels keyed by field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,
}
