// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Event bus and data service registrar.
//!
//! Wizards register one fetcher per [`EventType`]; steps trigger events and
//! subscribe to the resulting data and error streams without knowing who
//! fetches what.

pub mod error;
pub mod event;
pub mod messenger;
pub mod registrar;
pub mod step;

pub use error::{FetchError, RegistrarError, DEFAULT_SERVICE_ERROR};
pub use event::{Event, EventType};
pub use messenger::{EventSubscriber, Messenger};
pub use registrar::{DataServiceRegistrar, ErrorHandler, FetchFuture, Fetcher, Subscription};
pub use step::{appending_step_error_handler, default_step_error_handler, StepHandle};
