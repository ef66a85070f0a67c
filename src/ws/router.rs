//! Per-type event routing.
//!
//! Decouples the single stream connection from the many independent features
//! that care about different message types. Features register callbacks under
//! one or more [`EventKind`]s and get back a handle that removes exactly
//! those registrations when disposed (or dropped).

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, Weak};

use tracing::{debug, error, warn};

use super::messages::{Envelope, EventKind};

/// Callback invoked for each matching envelope.
pub type EventCallback = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Maps message kinds to the set of interested callbacks.
#[derive(Default)]
pub struct EventRouter {
    subscribers: RwLock<HashMap<EventKind, Vec<(u64, EventCallback)>>>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("subscriptions", &self.total_subscriptions())
            .finish()
    }
}

impl EventRouter {
    /// Creates an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `callback` under each of `kinds`.
    ///
    /// Registration has set semantics: passing the same callback (the same
    /// `Arc`) twice for a kind does not cause double delivery. Control kinds
    /// (`ping`/`pong`) are accepted but never dispatched.
    ///
    /// The returned handle unsubscribes the callback from exactly these kinds
    /// when disposed or dropped.
    pub fn subscribe(
        self: &Arc<Self>,
        kinds: &[EventKind],
        callback: EventCallback,
    ) -> SubscriptionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        for &kind in kinds {
            if kind.is_control() {
                warn!(%kind, "subscribing to a control kind; it will never be delivered");
            }
            let entries = subscribers.entry(kind).or_default();
            if entries.iter().any(|(_, cb)| Arc::ptr_eq(cb, &callback)) {
                continue;
            }
            entries.push((id, Arc::clone(&callback)));
        }

        SubscriptionHandle {
            router: Arc::downgrade(self),
            id,
            kinds: kinds.to_vec(),
            disposed: false,
        }
    }

    /// Delivers `envelope` to every callback registered under its kind.
    ///
    /// Callbacks run synchronously in wire order relative to each other per
    /// kind; a panicking callback is isolated and logged without affecting
    /// the remaining subscribers or the connection. Control envelopes are
    /// never delivered.
    pub fn dispatch(&self, envelope: &Envelope) {
        let kind = envelope.kind();
        if kind.is_control() {
            debug!(%kind, "control envelope filtered before dispatch");
            return;
        }

        // Snapshot under the read lock so a callback may subscribe or
        // unsubscribe without deadlocking. Changes take effect from the next
        // dispatched envelope.
        let callbacks: Vec<EventCallback> = {
            let subscribers = self
                .subscribers
                .read()
                .unwrap_or_else(PoisonError::into_inner);
            subscribers
                .get(&kind)
                .map(|entries| entries.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default()
        };

        for callback in callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(envelope))).is_err() {
                error!(%kind, "subscriber panicked during dispatch; continuing");
            }
        }
    }

    /// Returns the number of callbacks registered under `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Returns the total number of registrations across all kinds.
    #[must_use]
    pub fn total_subscriptions(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    fn unsubscribe(&self, id: u64, kinds: &[EventKind]) {
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        for kind in kinds {
            if let Some(entries) = subscribers.get_mut(kind) {
                entries.retain(|(entry_id, _)| *entry_id != id);
                if entries.is_empty() {
                    subscribers.remove(kind);
                }
            }
        }
    }
}

/// Disposer handle returned by [`EventRouter::subscribe`].
///
/// Disposal is idempotent and removes only this registration; other
/// subscribers of the same kinds are unaffected. Dropping the handle disposes
/// it as well.
#[derive(Debug)]
pub struct SubscriptionHandle {
    router: Weak<EventRouter>,
    id: u64,
    kinds: Vec<EventKind>,
    disposed: bool,
}

impl SubscriptionHandle {
    /// Removes the registration. Safe to call more than once.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        if let Some(router) = self.router.upgrade() {
            router.unsubscribe(self.id, &self.kinds);
        }
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}
