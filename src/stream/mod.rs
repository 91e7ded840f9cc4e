//! Live feed hub: pushes each newly logged record to connected listeners.
//!
//! Delivery is at-most-once and best-effort. There is no replay: a
//! listener only sees records logged while it is registered. A listener
//! that cannot take an event is dropped from the registry; nothing is
//! retried or acknowledged.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use crate::record::ChatRecord;

/// Size of the per-listener send buffer.
const LISTENER_BUFFER_SIZE: usize = 64;

/// The receiving half of one live feed subscription.
///
/// Dropping it disconnects the listener; the hub notices on the next
/// broadcast and removes the stale handle.
pub struct Listener {
    pub id: u64,
    pub rx: mpsc::Receiver<ChatRecord>,
}

/// Registry of open listener handles.
pub struct StreamHub {
    listeners: DashMap<u64, mpsc::Sender<ChatRecord>>,
    next_id: AtomicU64,
}

impl StreamHub {
    pub fn new() -> Self {
        Self {
            listeners: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a new listener and hand back its receiving half.
    pub fn register(&self) -> Listener {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(LISTENER_BUFFER_SIZE);
        self.listeners.insert(id, tx);
        debug!("registered stream listener {id}");
        Listener { id, rx }
    }

    /// Remove a listener handle.
    pub fn unregister(&self, id: u64) {
        if self.listeners.remove(&id).is_some() {
            debug!("unregistered stream listener {id}");
        }
    }

    /// Push one record to every registered listener.
    ///
    /// A listener whose channel is closed or whose buffer is full is
    /// removed; delivery to the remaining listeners continues and the
    /// caller never sees an error.
    pub fn broadcast(&self, record: &ChatRecord) {
        let mut dead = Vec::new();
        for entry in self.listeners.iter() {
            if entry.value().try_send(record.clone()).is_err() {
                dead.push(*entry.key());
            }
        }
        for id in dead {
            self.listeners.remove(&id);
            debug!("dropped stream listener {id}");
        }
    }

    /// Number of currently registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for StreamHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::NewRecord;

    fn record(id: i64) -> ChatRecord {
        NewRecord::now("hi", "hello").into_record(id)
    }

    #[tokio::test]
    async fn test_every_listener_receives_once() {
        let hub = StreamHub::new();
        let mut a = hub.register();
        let mut b = hub.register();

        hub.broadcast(&record(1));

        assert_eq!(a.rx.recv().await.unwrap().id, 1);
        assert_eq!(b.rx.recv().await.unwrap().id, 1);
        assert!(a.rx.try_recv().is_err());
        assert!(b.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_disconnected_listener_is_dropped() {
        let hub = StreamHub::new();
        let gone = hub.register();
        let mut alive = hub.register();

        drop(gone.rx);
        hub.broadcast(&record(1));

        assert_eq!(hub.listener_count(), 1);
        assert_eq!(alive.rx.recv().await.unwrap().id, 1);
    }

    #[tokio::test]
    async fn test_no_replay_for_late_listener() {
        let hub = StreamHub::new();
        hub.broadcast(&record(1));

        let mut late = hub.register();
        assert!(late.rx.try_recv().is_err());

        hub.broadcast(&record(2));
        assert_eq!(late.rx.recv().await.unwrap().id, 2);
    }

    #[tokio::test]
    async fn test_unregister_stops_delivery() {
        let hub = StreamHub::new();
        let listener = hub.register();

        hub.unregister(listener.id);
        assert_eq!(hub.listener_count(), 0);

        hub.broadcast(&record(1));
    }
}
