//! Typed event fan-out.
//!
//! Handlers are registered per event kind and receive every published event of
//! that kind. Registration returns a [`Subscription`]; dropping it removes the
//! handler.
//!
//! # Dispatch rules
//!
//! - `publish` snapshots the handlers for the event's kind, then releases the
//!   registry lock before calling any of them. Handlers may subscribe,
//!   unsubscribe or publish from inside a handler without deadlocking.
//! - A handler registered while a dispatch is running is not part of that
//!   dispatch's snapshot and does not see the event.
//! - Before each call the handler is checked against the live registry, so a
//!   handler removed mid-dispatch is not called for the rest of that dispatch.
//! - A handler that panics is logged and skipped; the remaining handlers still
//!   run. Builds with `panic = "abort"` cannot recover and abort as usual.

use std::{
    collections::HashMap,
    fmt,
    hash::Hash,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Weak},
};

use parking_lot::Mutex;
use tracing::warn;

/// An event that can be fanned out by kind.
pub trait Event: Send + Sync + 'static {
    /// Discriminant handlers subscribe to.
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;

    /// Kind of this event.
    fn kind(&self) -> Self::Kind;
}

type Handler<E> = Arc<dyn Fn(&E) + Send + Sync>;

struct Registry<E: Event> {
    next_id: u64,
    handlers: HashMap<E::Kind, Vec<(u64, Handler<E>)>>,
}

impl<E: Event> Registry<E> {
    fn contains(&self, kind: E::Kind, id: u64) -> bool {
        self.handlers.get(&kind).is_some_and(|list| list.iter().any(|(h, _)| *h == id))
    }
}

/// Removes a handler by id. Lets [`Subscription`] stay untyped.
trait Detach: Send + Sync {
    fn detach(&self, id: u64);
}

impl<E: Event> Detach for Mutex<Registry<E>> {
    fn detach(&self, id: u64) {
        let mut registry = self.lock();
        for list in registry.handlers.values_mut() {
            list.retain(|(h, _)| *h != id);
        }
        registry.handlers.retain(|_, list| !list.is_empty());
    }
}

/// Fan-out registry of handlers keyed by event kind.
///
/// Cloning yields another handle to the same registry.
pub struct EventBus<E: Event> {
    registry: Arc<Mutex<Registry<E>>>,
}

impl<E: Event> EventBus<E> {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry { next_id: 0, handlers: HashMap::new() })),
        }
    }

    /// Register `handler` for events of `kind`.
    pub fn subscribe<F>(&self, kind: E::Kind, handler: F) -> Subscription
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.registry.lock();
            registry.next_id += 1;
            let id = registry.next_id;
            registry.handlers.entry(kind).or_default().push((id, Arc::new(handler)));
            id
        };

        let weak: Weak<Mutex<Registry<E>>> = Arc::downgrade(&self.registry);
        Subscription { id, registry: Some(weak) }
    }

    /// Deliver `event` to every handler registered for its kind.
    ///
    /// Returns the number of handlers that ran to completion.
    pub fn publish(&self, event: &E) -> usize {
        let kind = event.kind();
        let snapshot: Vec<(u64, Handler<E>)> =
            self.registry.lock().handlers.get(&kind).cloned().unwrap_or_default();

        let mut delivered = 0;
        for (id, handler) in snapshot {
            if !self.registry.lock().contains(kind, id) {
                continue;
            }
            if catch_unwind(AssertUnwindSafe(|| handler(event))).is_err() {
                warn!(?kind, handler = id, "event handler panicked");
                continue;
            }
            delivered += 1;
        }

        delivered
    }

    /// Number of handlers registered for `kind`.
    pub fn handler_count(&self, kind: E::Kind) -> usize {
        self.registry.lock().handlers.get(&kind).map_or(0, Vec::len)
    }
}

impl<E: Event> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Event> Clone for EventBus<E> {
    fn clone(&self) -> Self {
        Self { registry: Arc::clone(&self.registry) }
    }
}

impl<E: Event> fmt::Debug for EventBus<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self.registry.lock();
        let counts: HashMap<_, _> =
            registry.handlers.iter().map(|(kind, list)| (*kind, list.len())).collect();
        f.debug_struct("EventBus").field("handlers", &counts).finish()
    }
}

/// Handle to a registered handler. Dropping it unregisters the handler.
#[must_use = "dropping a Subscription unregisters its handler"]
pub struct Subscription {
    id: u64,
    registry: Option<Weak<dyn Detach>>,
}

impl Subscription {
    /// Unregister now. Same as dropping.
    pub fn unsubscribe(self) {
        drop(self);
    }

    /// Keep the handler registered for the lifetime of the bus.
    pub fn forget(mut self) {
        self.registry = None;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.take().and_then(|weak| weak.upgrade()) {
            registry.detach(self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("attached", &self.registry.is_some())
            .finish()
    }
}
