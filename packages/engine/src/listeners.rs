//! Per-handle table of event callbacks.

use std::collections::HashMap;
use std::sync::Mutex;

use queue_core::{EventCallback, ListenerId, QueueEvent, QueueEventKind};

struct Entry {
    id: ListenerId,
    once: bool,
    callback: EventCallback,
}

/// Callbacks attached to one queue handle, grouped by event kind and kept
/// in attach order.
#[derive(Default)]
pub struct ListenerTable {
    entries: Mutex<HashMap<QueueEventKind, Vec<Entry>>>,
}

impl ListenerTable {
    /// Create a new empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a callback and return its id.
    pub fn add(&self, kind: QueueEventKind, callback: EventCallback, once: bool) -> ListenerId {
        let id = ListenerId::next();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries
            .entry(kind)
            .or_default()
            .push(Entry { id, once, callback });
        id
    }

    /// Detach a callback. Returns whether it was attached.
    pub fn remove(&self, kind: QueueEventKind, id: ListenerId) -> bool {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let Some(list) = entries.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|entry| entry.id != id);
        before != list.len()
    }

    /// Number of callbacks attached for `kind`.
    pub fn count(&self, kind: QueueEventKind) -> usize {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(&kind).map_or(0, Vec::len)
    }

    /// Invoke every callback attached for the event's kind.
    ///
    /// One-shot callbacks are detached before any callback runs, and the lock
    /// is released before invoking, so callbacks may attach or detach freely.
    pub fn dispatch(&self, event: &QueueEvent) {
        let callbacks: Vec<EventCallback> = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            let Some(list) = entries.get_mut(&event.kind()) else {
                return;
            };
            let callbacks = list.iter().map(|entry| entry.callback.clone()).collect();
            list.retain(|entry| !entry.once);
            callbacks
        };

        for callback in callbacks {
            callback(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, EventCallback) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = hits.clone();
        let callback: EventCallback = Arc::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (hits, callback)
    }

    #[test]
    fn once_callbacks_fire_a_single_time() {
        let table = ListenerTable::new();
        let (hits, callback) = counter();
        table.add(QueueEventKind::Paused, callback, true);

        table.dispatch(&QueueEvent::Paused);
        table.dispatch(&QueueEvent::Paused);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(table.count(QueueEventKind::Paused), 0);
    }

    #[test]
    fn remove_detaches_only_the_given_id() {
        let table = ListenerTable::new();
        let (hits, callback) = counter();
        let first = table.add(QueueEventKind::Resumed, callback.clone(), false);
        table.add(QueueEventKind::Resumed, callback, false);

        assert!(table.remove(QueueEventKind::Resumed, first));
        assert!(!table.remove(QueueEventKind::Resumed, first));
        assert!(!table.remove(QueueEventKind::Paused, first));

        table.dispatch(&QueueEvent::Resumed);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dispatch_only_reaches_matching_kind() {
        let table = ListenerTable::new();
        let (hits, callback) = counter();
        table.add(QueueEventKind::Closed, callback, false);

        table.dispatch(&QueueEvent::Paused);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
