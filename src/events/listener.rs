//! Listener framework shared by block, commit and contract listeners.
//!
//! # Lifecycle
//! ```text
//! add_*_listener → register on event service(s) → active
//!     → every routed event goes through `deliver` (one funnel per listener)
//!     → remove_*_listener | network disconnect → inactive
//! ```
//!
//! Callback failures and panics are logged and counted, never propagated
//! into the delivery task.

use async_trait::async_trait;
use futures_util::FutureExt;
use std::error::Error;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

use crate::events::service::{EventService, RegistrationId};
use crate::events::types::EventError;
use crate::observability::metrics;

/// What a listener callback returns.
pub type CallbackResult = Result<(), Box<dyn Error + Send + Sync>>;

/// Application callback for one kind of event.
///
/// Implemented for any `Fn(Result<E, EventError>) -> impl Future<Output = CallbackResult>`.
#[async_trait]
pub trait EventCallback<E: Send + 'static>: Send + Sync {
    async fn call(&self, event: Result<E, EventError>) -> CallbackResult;
}

#[async_trait]
impl<E, F, Fut> EventCallback<E> for F
where
    E: Send + 'static,
    F: Fn(Result<E, EventError>) -> Fut + Send + Sync,
    Fut: Future<Output = CallbackResult> + Send,
{
    async fn call(&self, event: Result<E, EventError>) -> CallbackResult {
        (self)(event).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Block,
    Commit,
    Contract,
}

impl ListenerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListenerKind::Block => "block",
            ListenerKind::Commit => "commit",
            ListenerKind::Contract => "contract",
        }
    }
}

/// Activity flag and event counter, written only by the delivery funnel
/// and by removal.
#[derive(Debug)]
pub struct ListenerState {
    active: AtomicBool,
    events_received: AtomicU64,
}

impl ListenerState {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(true),
            events_received: AtomicU64::new(0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }

    pub(crate) fn deactivate(&self) -> bool {
        self.active.swap(false, Ordering::AcqRel)
    }
}

/// Handle returned when a listener is added.
#[derive(Debug, Clone)]
pub struct ListenerHandle {
    id: Uuid,
    kind: ListenerKind,
    state: Arc<ListenerState>,
}

impl ListenerHandle {
    pub(crate) fn new(kind: ListenerKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            state: Arc::new(ListenerState::new()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    /// Number of successful events delivered to the callback.
    pub fn events_received(&self) -> u64 {
        self.state.events_received()
    }

    pub(crate) fn state(&self) -> Arc<ListenerState> {
        self.state.clone()
    }
}

/// A listener's registrations across one or more event services.
pub(crate) struct Registered {
    pub(crate) handle: ListenerHandle,
    registrations: Vec<(Arc<EventService>, RegistrationId)>,
}

impl Registered {
    pub(crate) fn new(handle: ListenerHandle) -> Self {
        Self {
            handle,
            registrations: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, service: Arc<EventService>, id: RegistrationId) {
        self.registrations.push((service, id));
    }

    pub(crate) fn services(&self) -> impl Iterator<Item = &Arc<EventService>> {
        self.registrations.iter().map(|(service, _)| service)
    }

    /// Deactivate and unregister. Returns false when already removed.
    pub(crate) fn remove(&self) -> bool {
        let was_active = self.handle.state.deactivate();
        for (service, id) in &self.registrations {
            service.unregister(*id);
        }
        was_active
    }
}

/// The single dispatch point for a listener.
pub(crate) async fn deliver<E: Send + 'static>(
    kind: ListenerKind,
    state: &ListenerState,
    callback: &dyn EventCallback<E>,
    event: Result<E, EventError>,
) {
    if !state.is_active() {
        return;
    }
    if event.is_ok() {
        state.events_received.fetch_add(1, Ordering::Relaxed);
    }
    let shutdown = matches!(event, Err(EventError::Shutdown { .. }));

    match AssertUnwindSafe(callback.call(event)).catch_unwind().await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(listener = kind.as_str(), error = %e, "Listener callback failed");
            metrics::record_listener_error(kind.as_str());
        }
        Err(_) => {
            tracing::warn!(listener = kind.as_str(), "Listener callback panicked");
            metrics::record_listener_error(kind.as_str());
        }
    }

    if shutdown {
        state.deactivate();
    }
}
