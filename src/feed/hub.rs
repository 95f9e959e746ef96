//! Broadcast hub for newly published entries
//!
//! The hub owns the live set of observer connections. Each observer gets a
//! bounded queue; `publish` pushes one shared event into every queue without
//! waiting. An observer whose queue is full or closed is dropped from the
//! live set on the spot, so a slow or broken client never stalls the
//! publisher or the other observers.
//!
//! Registration hands back a [`Subscription`] that unregisters itself when
//! dropped, so every connection has a release path.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::FeedEvent;
use crate::store::Entry;

/// Default per-observer queue capacity
pub const DEFAULT_FEED_BUFFER: usize = 64;

/// Identifies one observer connection for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "observer-{}", self.0)
    }
}

type EventSender = mpsc::Sender<Arc<FeedEvent>>;

/// Live set of observers
pub struct BroadcastHub {
    // Ids are allocated in increasing order, so map order is registration order
    observers: Mutex<BTreeMap<ConnectionId, EventSender>>,
    next_id: AtomicU64,
    buffer: usize,
}

impl BroadcastHub {
    pub fn new(buffer: usize) -> Arc<Self> {
        Arc::new(Self {
            observers: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            buffer: buffer.max(1),
        })
    }

    fn observers(&self) -> MutexGuard<'_, BTreeMap<ConnectionId, EventSender>> {
        // No code path panics while holding the lock; recover the map anyway
        self.observers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Add a new observer to the live set
    pub fn register(self: &Arc<Self>) -> Subscription {
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.buffer);

        let count = {
            let mut observers = self.observers();
            observers.insert(id, sender);
            observers.len()
        };
        debug!(connection = %id, observers = count, "Observer registered");

        Subscription {
            id,
            receiver,
            hub: Arc::downgrade(self),
        }
    }

    /// Remove an observer. Unknown or already-removed ids are a no-op.
    ///
    /// Returns whether the observer was present.
    pub fn unregister(&self, id: ConnectionId) -> bool {
        let (removed, count) = {
            let mut observers = self.observers();
            let removed = observers.remove(&id).is_some();
            (removed, observers.len())
        };

        if removed {
            debug!(connection = %id, observers = count, "Observer unregistered");
        }
        removed
    }

    /// Deliver an entry to every currently registered observer
    ///
    /// Never blocks. Returns the number of observers that accepted the event.
    pub fn publish(&self, entry: &Entry) -> usize {
        let event = Arc::new(FeedEvent::NewEntry {
            entry: entry.clone(),
        });

        let mut delivered = 0;
        let mut dropped = Vec::new();
        {
            let mut observers = self.observers();
            for (id, sender) in observers.iter() {
                match sender.try_send(Arc::clone(&event)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(connection = %id, "Observer queue full, dropping observer");
                        dropped.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => {
                        debug!(connection = %id, "Observer gone, dropping observer");
                        dropped.push(*id);
                    }
                }
            }
            for id in &dropped {
                observers.remove(id);
            }
        }

        info!(
            entry = %entry.id,
            delivered,
            dropped = dropped.len(),
            "Entry broadcast"
        );
        delivered
    }

    pub fn connection_count(&self) -> usize {
        self.observers().len()
    }

    pub fn is_registered(&self, id: ConnectionId) -> bool {
        self.observers().contains_key(&id)
    }
}

/// An observer's handle on the hub
///
/// Dropping it removes the observer from the live set.
pub struct Subscription {
    id: ConnectionId,
    receiver: mpsc::Receiver<Arc<FeedEvent>>,
    hub: Weak<BroadcastHub>,
}

impl Subscription {
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Wait for the next event. `None` once the hub has dropped this observer.
    pub async fn recv(&mut self) -> Option<Arc<FeedEvent>> {
        self.receiver.recv().await
    }

    /// Take an already-queued event without waiting
    pub fn try_recv(&mut self) -> Option<Arc<FeedEvent>> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            hub.unregister(self.id);
        }
    }
}
