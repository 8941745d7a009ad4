// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors for user data operations and the report returned by batch operations.

use kickstart_app_core::StoreError;
use thiserror::Error;
use tracing::warn;

use crate::model::UserDataIdentifier;

/// Error type for user data operations.
///
/// Everything except [`UserDataError::Store`] is a configuration problem with
/// a field mapping or form; batch operations skip those fields and carry on.
#[derive(Debug, Error)]
pub enum UserDataError {
    /// Storage or serialization failure.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// The form has no control for the field.
    #[error("no form control for {0}")]
    MissingControl(UserDataIdentifier),
    /// A field needed a value or object retriever but none was provided.
    #[error("field {field} needs a retriever, but none was provided")]
    MissingRetriever {
        /// Field name.
        field: String,
    },
    /// A field without a control has no restorer.
    #[error("field {field} has no DOM control, but no restorer was provided")]
    MissingRestorer {
        /// Field name.
        field: String,
    },
    /// The mapping combines flags that cannot work together.
    #[error("invalid field mapping for {step}.{field}: {reason}")]
    InvalidMapping {
        /// Step name.
        step: String,
        /// Field name.
        field: String,
        /// What is wrong.
        reason: String,
    },
}

/// Fields skipped by a batch store/build/restore because of configuration errors.
#[derive(Debug, Default)]
pub struct MappingReport {
    /// Skipped fields, in processing order.
    pub skipped: Vec<UserDataError>,
}

impl MappingReport {
    /// True when no field was skipped.
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Record a configuration error.
    pub fn note(&mut self, err: UserDataError) {
        warn!(error = %err, "skipping field");
        self.skipped.push(err);
    }

    /// Keep going on configuration errors, stop on storage errors.
    pub fn absorb(&mut self, result: Result<(), UserDataError>) -> Result<(), StoreError> {
        match result {
            Ok(()) => Ok(()),
            Err(UserDataError::Store(e)) => Err(e),
            Err(other) => {
                self.note(other);
                Ok(())
            }
        }
    }
}
