//! Authentication event bus
//!
//! Session-level notifications fan out here so UI shells can react to the
//! session ending without the HTTP layer knowing anything about navigation.
//! Dispatch is synchronous and isolated: a panicking handler is logged and
//! skipped, never letting it block the handlers after it.

use crate::error::AuthError;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

/// Session-level authentication events
#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    /// The session ended; credentials have been cleared
    Logout {
        /// Human-readable cause, when known
        reason: Option<String>,
    },
    /// A refresh cycle failed; credentials have been cleared
    TokenRefreshFailed {
        /// The failure that ended the cycle
        error: AuthError,
    },
    /// A public endpoint answered 401
    Unauthorized {
        /// Context for the rejection, when known
        reason: Option<String>,
    },
}

impl AuthEvent {
    /// The kind tag used for subscription filtering
    #[must_use]
    pub fn kind(&self) -> AuthEventKind {
        match self {
            Self::Logout { .. } => AuthEventKind::Logout,
            Self::TokenRefreshFailed { .. } => AuthEventKind::TokenRefreshFailed,
            Self::Unauthorized { .. } => AuthEventKind::Unauthorized,
        }
    }
}

/// Event kinds, for subscription filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthEventKind {
    /// Session ended
    Logout,
    /// Refresh cycle failed
    TokenRefreshFailed,
    /// Public endpoint rejected the request
    Unauthorized,
}

type Handler = Arc<dyn Fn(&AuthEvent) + Send + Sync>;

/// Synchronous fan-out bus for [`AuthEvent`]s
///
/// Cheap to clone; clones share the subscriber table. Dispatch walks a
/// snapshot of the subscriber list taken under the lock, so handlers may
/// subscribe or unsubscribe mid-dispatch without corrupting iteration.
#[derive(Clone, Default)]
pub struct AuthEventBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    subscribers: Mutex<HashMap<AuthEventKind, Vec<(u64, Handler)>>>,
    next_id: AtomicU64,
}

impl AuthEventBus {
    /// Create an empty bus
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe a handler to one event kind
    ///
    /// The handler stays attached until the returned [`Subscription`] is
    /// dropped or [`Subscription::unsubscribe`] is called.
    pub fn subscribe<F>(&self, kind: AuthEventKind, handler: F) -> Subscription
    where
        F: Fn(&AuthEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            bus: Arc::clone(&self.inner),
            kind,
            id,
        }
    }

    /// Deliver an event to every subscriber of its kind
    ///
    /// A no-op when nobody subscribed. Handlers run in subscription order;
    /// a panicking handler is caught and logged, and later handlers still
    /// run.
    pub fn emit(&self, event: &AuthEvent) {
        let kind = event.kind();
        let snapshot: Vec<Handler> = {
            let subscribers = self.inner.subscribers.lock().unwrap();
            subscribers
                .get(&kind)
                .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
                .unwrap_or_default()
        };

        debug!(?kind, subscribers = snapshot.len(), "dispatching auth event");
        for handler in snapshot {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
                error!(?kind, panic = panic_message(&panic), "auth event handler panicked");
            }
        }
    }

    /// Remove every subscriber of one kind, or all subscribers
    pub fn remove_all(&self, kind: Option<AuthEventKind>) {
        let mut subscribers = self.inner.subscribers.lock().unwrap();
        match kind {
            Some(kind) => {
                subscribers.remove(&kind);
            }
            None => subscribers.clear(),
        }
    }

    /// Number of live subscribers for one kind
    #[must_use]
    pub fn subscriber_count(&self, kind: AuthEventKind) -> usize {
        self.inner
            .subscribers
            .lock()
            .unwrap()
            .get(&kind)
            .map_or(0, Vec::len)
    }
}

/// Handle to a registered event handler
///
/// Dropping the handle detaches the handler.
pub struct Subscription {
    bus: Arc<BusInner>,
    kind: AuthEventKind,
    id: u64,
}

impl Subscription {
    /// Detach the handler from the bus
    ///
    /// Equivalent to dropping the handle; named for call sites where the
    /// intent should be visible.
    pub fn unsubscribe(self) {
        // Drop does the detaching.
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let mut subscribers = self.bus.subscribers.lock().unwrap();
        if let Some(handlers) = subscribers.get_mut(&self.kind) {
            handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}
