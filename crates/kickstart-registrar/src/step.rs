// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! What the registrar needs to know about a wizard step, and the two stock
//! error handlers that write to its error notification.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

/// A live wizard step: its name, the error text shown to the user, and a
/// destroy signal that ends its subscriptions.
///
/// Clones share state.
#[derive(Debug, Clone)]
pub struct StepHandle {
    form_name: String,
    error_notification: Arc<Mutex<String>>,
    destroyed: Arc<watch::Sender<bool>>,
}

impl StepHandle {
    /// New, live step.
    pub fn new(form_name: impl Into<String>) -> Self {
        let (destroyed, _rx) = watch::channel(false);
        Self {
            form_name: form_name.into(),
            error_notification: Arc::new(Mutex::new(String::new())),
            destroyed: Arc::new(destroyed),
        }
    }

    /// Step (form) name.
    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    /// Current error text; empty when there is no error.
    pub fn error_notification(&self) -> String {
        self.notification().clone()
    }

    /// Replace the error text.
    pub fn set_error_notification(&self, text: impl Into<String>) {
        *self.notification() = text.into();
    }

    /// Tear the step down; its step subscriptions stop delivering.
    pub fn destroy(&self) {
        self.destroyed.send_replace(true);
    }

    /// Whether [`StepHandle::destroy`] has been called.
    pub fn is_destroyed(&self) -> bool {
        *self.destroyed.borrow()
    }

    pub(crate) fn destroyed_signal(&self) -> watch::Receiver<bool> {
        self.destroyed.subscribe()
    }

    fn notification(&self) -> MutexGuard<'_, String> {
        self.error_notification
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handler that overwrites the step's error text (empty clears it).
pub fn default_step_error_handler(step: &StepHandle) -> impl FnMut(&str) + Send + 'static {
    let step = step.clone();
    move |error: &str| step.set_error_notification(error)
}

/// Handler that appends to the step's error text instead of overwriting it.
///
/// An empty error clears the text. The same error is not appended twice in a
/// row. Used by steps that fire several fetches at once.
pub fn appending_step_error_handler(step: &StepHandle) -> impl FnMut(&str) + Send + 'static {
    let step = step.clone();
    move |error: &str| {
        let mut current = step.notification();
        if error.is_empty() {
            current.clear();
        } else if !current.ends_with(error) {
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(error);
        }
    }
}
