// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wizard user data: typed store/restore of form fields over the durable store.
//!
//! - [`service::UserDataService`] stores `{display, value}` entries per
//!   `(wizard, step, field)` and answers staleness questions.
//! - [`form_service::UserDataFormService`] walks a [`field_mapping::StepMapping`]
//!   to save, build and restore whole steps.

pub mod error;
pub mod field_mapping;
pub mod form;
pub mod form_service;
pub mod map_codec;
pub mod model;
pub mod service;
pub mod value;

pub use error::{MappingReport, UserDataError};
pub use field_mapping::{
    BackingObjectMap, FeatureFlags, FieldKind, FieldMapping, ObjectRetrievalMap, ObjectRetriever,
    StepMapping,
};
pub use form::{FormControl, FormGroup};
pub use form_service::UserDataFormService;
pub use model::{UserDataEntry, UserDataIdentifier, UserDataStep, UserDataWizard};
pub use service::{UserDataService, MASK};
