// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event vocabulary shared by wizards, steps and the registrar.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of events published on the [`crate::Messenger`].
///
/// Serialized in `SCREAMING_SNAKE_CASE` (e.g. `AWS_REGION_CHANGED`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[allow(missing_docs)]
pub enum EventType {
    AwsAirgappedVpcChange,
    AwsGetExistingVpcs,
    AwsGetSubnets,
    AwsGetAvailabilityZones,
    AwsGetNodeTypes,
    AwsRegionChanged,
    AwsVpcChanged,
    AwsVpcTypeChanged,
    AzureGetResourceGroups,
    AzureGetVnets,
    AzureRegionChanged,
    BrandingChanged,
    CliChanged,
    NetworkStepGetNoProxyInfo,
    StepCompleted,
    StepDescriptionChange,
    StepStarted,
    VsphereConfigFileImported,
    VsphereConfigFileImportError,
    VsphereControlPlaneEndpointProviderChanged,
    VsphereDatacenterChanged,
    VsphereGetComputeResource,
    VsphereGetDataStores,
    VsphereGetOsImages,
    VsphereGetResourcePools,
    VsphereGetVmFolders,
    VsphereGetVmNetworks,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_value(self) {
            Ok(Value::String(name)) => f.write_str(&name),
            _ => write!(f, "{self:?}"),
        }
    }
}

/// One published event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// What happened.
    #[serde(rename = "type")]
    pub event_type: EventType,
    /// Optional data attached by the publisher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl Event {
    /// Event without a payload.
    pub fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            payload: None,
        }
    }

    /// Event carrying `payload`.
    pub fn with_payload(event_type: EventType, payload: Value) -> Self {
        Self {
            event_type,
            payload: Some(payload),
        }
    }
}
