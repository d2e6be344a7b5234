//! Fan-out of envelopes to every open observer channel
//!
//! Each observer gets a bounded mpsc queue drained by its WebSocket task. An
//! envelope is serialized exactly once into a shared `Arc<str>` and that same
//! buffer is handed to every queue, so an observer can never see a partially
//! written frame even when it registers in the middle of a broadcast.
//!
//! ## Delivery discipline
//!
//! - At most once, best effort: sends use `try_send` and never wait
//! - A full queue drops the *new* envelope for that observer only
//! - A closed queue is skipped; the entry stays until its connection task
//!   calls [`Broadcaster::unregister`]
//! - Per-observer order follows publish order; nothing is ordered across observers

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tokio::sync::{RwLock, mpsc, mpsc::error::TrySendError};
use tracing::{debug, error, info, trace, warn};

use crate::events::{Envelope, FleetEvent};

/// Default per-observer queue length
pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

pub type ObserverId = u64;

/// Receiving end handed to a newly registered observer
pub struct Observer {
    pub id: ObserverId,
    pub frames: mpsc::Receiver<Arc<str>>,
}

/// What happened to one published envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Observers whose queue was full
    pub dropped: usize,
    /// Observers whose queue was already closed
    pub closed: usize,
}

/// Registry of open observer channels
#[derive(Clone)]
pub struct Broadcaster {
    observers: Arc<RwLock<HashMap<ObserverId, mpsc::Sender<Arc<str>>>>>,
    next_id: Arc<AtomicU64>,
    buffer: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_OBSERVER_BUFFER)
    }
}

impl Broadcaster {
    pub fn new(buffer: usize) -> Self {
        Self {
            observers: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            buffer: buffer.max(1),
        }
    }

    /// Open a channel for a new observer.
    ///
    /// The `connected` greeting is queued before the channel joins the registry,
    /// so it is always the first frame the observer reads.
    pub async fn register(&self) -> Observer {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);

        match Envelope::connected().encode() {
            Ok(greeting) => {
                let _ = tx.try_send(Arc::from(greeting));
            }
            Err(e) => error!(observer = id, "failed to encode greeting: {e}"),
        }

        self.observers.write().await.insert(id, tx);
        info!(observer = id, "observer registered");

        Observer { id, frames: rx }
    }

    /// Remove an observer; returns whether it was still registered.
    pub async fn unregister(&self, id: ObserverId) -> bool {
        let removed = self.observers.write().await.remove(&id).is_some();
        if removed {
            info!(observer = id, "observer unregistered");
        }
        removed
    }

    pub async fn observer_count(&self) -> usize {
        self.observers.read().await.len()
    }

    /// Stamp an event with the current time and fan it out.
    pub async fn publish(&self, event: FleetEvent) -> BroadcastReport {
        self.publish_envelope(&Envelope::new(event)).await
    }

    pub async fn publish_envelope(&self, envelope: &Envelope) -> BroadcastReport {
        let frame: Arc<str> = match envelope.encode() {
            Ok(text) => Arc::from(text),
            Err(e) => {
                error!(kind = %envelope.kind(), "failed to encode envelope: {e}");
                return BroadcastReport::default();
            }
        };

        let mut report = BroadcastReport::default();
        let observers = self.observers.read().await;

        for (id, tx) in observers.iter() {
            match tx.try_send(Arc::clone(&frame)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!(
                        observer = id,
                        kind = %envelope.kind(),
                        "observer queue full, dropping envelope"
                    );
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(observer = id, "skipping closed observer channel");
                    report.closed += 1;
                }
            }
        }

        trace!(
            kind = %envelope.kind(),
            delivered = report.delivered,
            dropped = report.dropped,
            closed = report.closed,
            "published envelope"
        );

        report
    }
}
