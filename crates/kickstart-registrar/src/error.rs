// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Registrar errors and the backend failure type fetchers return.

use serde_json::Value;
use thiserror::Error;

use crate::event::EventType;

/// Shown when a failed fetch produced no usable text at all.
pub const DEFAULT_SERVICE_ERROR: &str = "Service error encountered";

/// Error type for registrar operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrarError {
    /// A fetcher is already registered for the event; the first one stays.
    #[error("ignoring duplicate registration of event {0}")]
    AlreadyRegistered(EventType),
    /// Nothing was registered for the event.
    #[error("event {0} has not been registered")]
    NotRegistered(EventType),
    /// The event was registered with a different data type.
    #[error("event {0} was registered with a different data type")]
    TypeMismatch(EventType),
}

/// Failure reported by a fetcher, holding the backend's error body.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", self.message())]
pub struct FetchError {
    body: Value,
}

impl FetchError {
    /// Wrap a backend error body.
    pub fn new(body: Value) -> Self {
        Self { body }
    }

    /// Error carrying only a message.
    pub fn message_only(message: impl Into<String>) -> Self {
        Self::new(serde_json::json!({ "message": message.into() }))
    }

    /// Raw error body.
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// Best human-readable text in the body.
    ///
    /// Looks at `error.message`, then `message`, then falls back to the body's
    /// JSON text. A bare string body is its own message; `null` has none.
    pub fn message(&self) -> String {
        let non_empty = |v: Option<&Value>| {
            v.and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
        };
        non_empty(self.body.pointer("/error/message"))
            .or_else(|| non_empty(self.body.get("message")))
            .unwrap_or_else(|| match &self.body {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
    }

    /// Text for the error stream: `static_error` and the message joined by a
    /// space, or [`DEFAULT_SERVICE_ERROR`] when both are empty.
    pub fn describe(&self, static_error: Option<&str>) -> String {
        let message = self.message();
        let text = match static_error.filter(|s| !s.is_empty()) {
            Some(prefix) if message.is_empty() => prefix.to_owned(),
            Some(prefix) => format!("{prefix} {message}"),
            None => message,
        };
        if text.is_empty() {
            DEFAULT_SERVICE_ERROR.to_owned()
        } else {
            text
        }
    }
}
