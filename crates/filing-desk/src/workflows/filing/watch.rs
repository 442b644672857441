//! Change notification fan-out: one watch channel per filing, created on
//! demand when the first viewer subscribes and torn down when the last one
//! leaves.
//!
//! A receiver observes the current record immediately via `borrow()` and each
//! committed mutation thereafter via `changed()`. Delivery is per-viewer
//! monotonic: a slow viewer may skip intermediate states but never sees an
//! older record after a newer one.

use std::collections::HashMap;
use std::sync::RwLock;

use tokio::sync::watch;

use super::domain::{FilingId, FilingRecord};

/// Receiver yielding the newest committed record for one filing.
pub type FilingWatcher = watch::Receiver<FilingRecord>;

struct WatcherEntry {
    sender: watch::Sender<FilingRecord>,
    subscribers: usize,
}

#[derive(Default)]
pub struct FilingWatchRegistry {
    watchers: RwLock<HashMap<FilingId, WatcherEntry>>,
}

impl FilingWatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a viewer. The channel is seeded with `current`, so the
    /// returned receiver yields the full record immediately.
    pub fn subscribe(&self, current: &FilingRecord) -> FilingWatcher {
        let mut watchers = self.watchers.write().expect("watcher lock poisoned");
        let entry = watchers
            .entry(current.id.clone())
            .or_insert_with(|| WatcherEntry {
                sender: watch::channel(current.clone()).0,
                subscribers: 0,
            });
        entry.subscribers += 1;
        entry.sender.subscribe()
    }

    /// Deliver a committed mutation to every viewer of the filing. Callers
    /// hold the filing's write serialization while publishing, which is what
    /// makes delivery follow commit order.
    pub fn publish(&self, record: &FilingRecord) {
        let watchers = self.watchers.read().expect("watcher lock poisoned");
        if let Some(entry) = watchers.get(&record.id) {
            let _ = entry.sender.send(record.clone());
        }
    }

    /// Release one viewer. Idempotent: extra calls after the last viewer has
    /// left are a no-op. The channel is dropped when the count reaches zero.
    pub fn unsubscribe(&self, id: &FilingId) {
        let mut watchers = self.watchers.write().expect("watcher lock poisoned");
        if let Some(entry) = watchers.get_mut(id) {
            entry.subscribers = entry.subscribers.saturating_sub(1);
            if entry.subscribers == 0 {
                watchers.remove(id);
            }
        }
    }

    pub fn subscriber_count(&self, id: &FilingId) -> usize {
        let watchers = self.watchers.read().expect("watcher lock poisoned");
        watchers.get(id).map(|entry| entry.subscribers).unwrap_or(0)
    }
}
