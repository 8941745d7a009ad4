// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Links events to backend fetchers and fans the results out to steps.
//!
//! A wizard [`register`](DataServiceRegistrar::register)s a fetcher per event.
//! Whenever that event is published, the fetcher runs with the event payload
//! and its result lands on two latest-value streams: data and error text.
//! Steps [`subscribe`](DataServiceRegistrar::subscribe) to those streams and
//! get the latest value immediately, then every later one.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::{Map, Value};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument, warn};

use crate::error::{FetchError, RegistrarError};
use crate::event::{Event, EventType};
use crate::messenger::Messenger;
use crate::step::{default_step_error_handler, StepHandle};

/// Future returned by a fetcher.
pub type FetchFuture<T> = Pin<Box<dyn Future<Output = Result<Vec<T>, FetchError>> + Send>>;
/// Backend call run with the triggering event's payload.
pub type Fetcher<T> = Arc<dyn Fn(Value) -> FetchFuture<T> + Send + Sync>;
/// Boxed error callback, as accepted by [`DataServiceRegistrar::step_subscribe`].
pub type ErrorHandler = Box<dyn FnMut(&str) + Send>;

type DataStream<T> = watch::Sender<Option<Arc<Vec<T>>>>;
type ErrorStream = watch::Sender<Option<String>>;

struct Entry<T> {
    event_type: EventType,
    fetcher: Fetcher<T>,
    static_error: Option<String>,
    data: DataStream<T>,
    errors: ErrorStream,
    issued: AtomicU64,
    applied: Mutex<u64>,
}

impl<T> Entry<T>
where
    T: Send + Sync + 'static,
{
    fn new(event_type: EventType, fetcher: Fetcher<T>, static_error: Option<String>) -> Self {
        Self {
            event_type,
            fetcher,
            static_error,
            data: watch::channel(None).0,
            errors: watch::channel(None).0,
            issued: AtomicU64::new(0),
            applied: Mutex::new(0),
        }
    }

    fn next_generation(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    #[instrument(level = "debug", skip(self, payload), fields(event = %self.event_type))]
    async fn fetch(self: Arc<Self>, generation: u64, payload: Value) {
        let result = (self.fetcher)(payload).await;
        self.apply(generation, result);
    }

    fn apply(&self, generation: u64, result: Result<Vec<T>, FetchError>) {
        let mut applied = self.applied.lock().unwrap_or_else(PoisonError::into_inner);
        if generation < *applied {
            debug!(event = %self.event_type, generation, latest = *applied, "dropping stale fetch result");
            return;
        }
        *applied = generation;
        match result {
            Ok(items) => {
                debug!(event = %self.event_type, count = items.len(), "fetch succeeded");
                self.data.send_replace(Some(Arc::new(items)));
                self.errors.send_replace(Some(String::new()));
            }
            Err(err) => {
                let message = err.describe(self.static_error.as_deref());
                warn!(event = %self.event_type, error = %message, "fetch failed");
                self.errors.send_replace(Some(message));
                self.data.send_replace(Some(Arc::new(Vec::new())));
            }
        }
    }
}

/// Type-independent view of an entry.
trait ErasedEntry: Send + Sync {
    fn clear(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T> ErasedEntry for Entry<T>
where
    T: Send + Sync + 'static,
{
    fn clear(&self) {
        self.data.send_replace(Some(Arc::new(Vec::new())));
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Handle to the delivery tasks of one subscription.
#[derive(Debug)]
pub struct Subscription {
    data: JoinHandle<()>,
    errors: JoinHandle<()>,
}

impl Subscription {
    /// Stop delivering to both callbacks.
    pub fn cancel(&self) {
        self.data.abort();
        self.errors.abort();
    }

    /// Both delivery tasks have ended.
    pub fn is_finished(&self) -> bool {
        self.data.is_finished() && self.errors.is_finished()
    }
}

/// Registry of event → fetcher links. Clones share the same registry.
///
/// [`register`](Self::register) and the subscribe methods spawn tasks and must
/// be called from within a Tokio runtime.
#[derive(Clone)]
pub struct DataServiceRegistrar {
    messenger: Messenger,
    entries: Arc<Mutex<HashMap<EventType, Arc<dyn ErasedEntry>>>>,
}

impl std::fmt::Debug for DataServiceRegistrar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataServiceRegistrar")
            .field("registered", &self.lock().len())
            .finish_non_exhaustive()
    }
}

impl DataServiceRegistrar {
    /// Registrar listening on `messenger`.
    pub fn new(messenger: Messenger) -> Self {
        Self {
            messenger,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Bus this registrar listens on.
    pub fn messenger(&self) -> &Messenger {
        &self.messenger
    }

    /// Publish each event in `event_types` with the same payload.
    pub fn trigger(&self, event_types: &[EventType], payload: Option<Value>) {
        for &event_type in event_types {
            self.messenger.publish(Event {
                event_type,
                payload: payload.clone(),
            });
        }
    }

    /// Push an empty list on the event's data stream.
    pub fn clear(&self, event_type: EventType) -> Result<(), RegistrarError> {
        self.entry(event_type)?.clear();
        Ok(())
    }

    /// Whether a fetcher is registered for `event_type`.
    pub fn is_registered(&self, event_type: EventType) -> bool {
        self.lock().contains_key(&event_type)
    }

    /// Run `fetcher` every time `event_type` is published.
    ///
    /// The first registration wins: a second one for the same event is
    /// rejected and the first fetcher stays. `static_error` prefixes every
    /// error message the fetcher produces. A missing or null payload reaches
    /// the fetcher as `{}`.
    pub fn register<T, F, Fut>(
        &self,
        event_type: EventType,
        fetcher: F,
        static_error: Option<&str>,
    ) -> Result<(), RegistrarError>
    where
        T: Send + Sync + 'static,
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Vec<T>, FetchError>> + Send + 'static,
    {
        let fetcher: Fetcher<T> =
            Arc::new(move |payload: Value| -> FetchFuture<T> { Box::pin(fetcher(payload)) });
        let entry = Arc::new(Entry::new(
            event_type,
            fetcher,
            static_error.map(str::to_owned),
        ));
        {
            let mut entries = self.lock();
            if entries.contains_key(&event_type) {
                warn!(event = %event_type, "ignoring duplicate registration");
                return Err(RegistrarError::AlreadyRegistered(event_type));
            }
            entries.insert(event_type, Arc::clone(&entry) as Arc<dyn ErasedEntry>);
        }
        let mut events = self.messenger.subscribe(event_type);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let payload = event
                    .payload
                    .filter(|p| !p.is_null())
                    .unwrap_or_else(|| Value::Object(Map::new()));
                let generation = entry.next_generation();
                debug!(event = %event_type, generation, "fetching");
                tokio::spawn(Arc::clone(&entry).fetch(generation, payload));
            }
        });
        debug!(event = %event_type, "registered fetcher");
        Ok(())
    }

    /// Deliver the event's data and error text to the callbacks, starting with
    /// the latest value if there is one.
    pub fn subscribe<T, D, E>(
        &self,
        event_type: EventType,
        on_data: D,
        on_error: E,
    ) -> Result<Subscription, RegistrarError>
    where
        T: Send + Sync + 'static,
        D: FnMut(&[T]) + Send + 'static,
        E: FnMut(&str) + Send + 'static,
    {
        self.subscribe_until(event_type, None, on_data, on_error)
    }

    /// [`subscribe`](Self::subscribe) on behalf of a step.
    ///
    /// Delivery stops when the step is destroyed. Without `on_error` the
    /// step's error notification is overwritten with each error.
    pub fn step_subscribe<T, D>(
        &self,
        step: &StepHandle,
        event_type: EventType,
        on_data: D,
        on_error: Option<ErrorHandler>,
    ) -> Result<Subscription, RegistrarError>
    where
        T: Send + Sync + 'static,
        D: FnMut(&[T]) + Send + 'static,
    {
        if !self.is_registered(event_type) {
            error!(
                event = %event_type,
                step = step.form_name(),
                "step subscribed to an event that was never registered"
            );
            return Err(RegistrarError::NotRegistered(event_type));
        }
        let on_error = on_error
            .unwrap_or_else(|| -> ErrorHandler { Box::new(default_step_error_handler(step)) });
        self.subscribe_until(event_type, Some(step.destroyed_signal()), on_data, on_error)
    }

    /// See [`crate::step::appending_step_error_handler`].
    pub fn appending_step_error_handler(&self, step: &StepHandle) -> ErrorHandler {
        Box::new(crate::step::appending_step_error_handler(step))
    }

    fn subscribe_until<T, D, E>(
        &self,
        event_type: EventType,
        until: Option<watch::Receiver<bool>>,
        mut on_data: D,
        mut on_error: E,
    ) -> Result<Subscription, RegistrarError>
    where
        T: Send + Sync + 'static,
        D: FnMut(&[T]) + Send + 'static,
        E: FnMut(&str) + Send + 'static,
    {
        let entry = self.typed_entry::<T>(event_type)?;
        let data = spawn_delivery(entry.data.subscribe(), until.clone(), move |items| {
            on_data(items.as_slice());
        });
        let errors = spawn_delivery(entry.errors.subscribe(), until, move |message| {
            on_error(&message);
        });
        Ok(Subscription { data, errors })
    }

    fn typed_entry<T>(&self, event_type: EventType) -> Result<Arc<Entry<T>>, RegistrarError>
    where
        T: Send + Sync + 'static,
    {
        self.entry(event_type)?
            .into_any()
            .downcast::<Entry<T>>()
            .map_err(|_| {
                error!(event = %event_type, "subscriber data type does not match registration");
                RegistrarError::TypeMismatch(event_type)
            })
    }

    fn entry(&self, event_type: EventType) -> Result<Arc<dyn ErasedEntry>, RegistrarError> {
        self.lock().get(&event_type).cloned().ok_or_else(|| {
            warn!(event = %event_type, "no entry registered for event");
            RegistrarError::NotRegistered(event_type)
        })
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventType, Arc<dyn ErasedEntry>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// Calls `deliver` with the current value (if any) and every later one, until
// the stream closes or `until` fires.
fn spawn_delivery<V, F>(
    mut rx: watch::Receiver<Option<V>>,
    mut until: Option<watch::Receiver<bool>>,
    mut deliver: F,
) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
    F: FnMut(V) + Send + 'static,
{
    tokio::spawn(async move {
        loop {
            if until.as_ref().is_some_and(|u| *u.borrow()) {
                break;
            }
            let current = rx.borrow_and_update().clone();
            if let Some(value) = current {
                deliver(value);
            }
            match until.as_mut() {
                Some(until) => {
                    tokio::select! {
                        changed = rx.changed() => {
                            if changed.is_err() {
                                break;
                            }
                        }
                        _ = until.changed() => break,
                    }
                }
                None => {
                    if rx.changed().await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}
