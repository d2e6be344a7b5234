//! Typed in-process event bus
//!
//! Subscribers register per [`EventKind`]. Dispatch calls every handler for
//! the envelope's kind in subscription order. Handlers run outside the lock,
//! so a handler may subscribe or unsubscribe without deadlocking.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::RwLock;

use crate::events::{Envelope, EventKind};

/// Callback invoked for each matching envelope
pub type Handler = Arc<dyn Fn(&Envelope) + Send + Sync>;

/// Identity of one subscription, used to remove it again
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<(SubscriptionId, Handler)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Envelope) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers
            .write()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler)));
        id
    }

    /// Remove one subscription; returns whether it existed.
    pub fn unsubscribe(&self, kind: EventKind, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let Some(list) = handlers.get_mut(&kind) else {
            return false;
        };

        let before = list.len();
        list.retain(|(existing, _)| *existing != id);
        before != list.len()
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        self.handlers.read().get(&kind).map_or(0, Vec::len)
    }

    /// Call every handler subscribed to the envelope's kind.
    ///
    /// Returns how many handlers ran.
    pub fn dispatch(&self, envelope: &Envelope) -> usize {
        let snapshot: Vec<Handler> = self
            .handlers
            .read()
            .get(&envelope.kind())
            .map(|list| list.iter().map(|(_, handler)| Arc::clone(handler)).collect())
            .unwrap_or_default();

        for handler in &snapshot {
            handler(envelope);
        }

        snapshot.len()
    }
}
