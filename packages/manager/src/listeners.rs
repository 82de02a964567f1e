//! Fan-out of one listener over every queue handle.
//!
//! Attaching a listener wraps it once per queue, so the wrapper can pass the
//! originating queue along with the event. The engine only knows the
//! wrappers, so the ids it hands back are kept in a side table under a
//! [`SubscriptionId`]. Detaching walks the registry in the same order and
//! removes exactly the wrappers recorded for that subscription.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use queue_core::{EventCallback, ListenerId, QueueEvent, QueueEventKind, QueueHandle, QueueName};

use crate::error::{ManagerError, ManagerResult};
use crate::registry::QueueRegistry;

/// A listener for events of every queue; receives the originating queue first.
pub type Listener<H> = Arc<dyn Fn(&Arc<H>, &QueueEvent) + Send + Sync>;

/// Token returned by `on()`, needed to detach the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscription-{}", self.0)
    }
}

struct Registration {
    kind: QueueEventKind,
    /// One wrapper per queue, in registry order.
    wrappers: Vec<ListenerId>,
}

/// Side table of attached wrappers, keyed by subscription.
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: AtomicU64,
    registrations: Mutex<HashMap<SubscriptionId, Registration>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `listener` for `kind` on every queue and record the wrappers.
    pub fn attach<Q: QueueName, H: QueueHandle>(
        &self,
        queues: &QueueRegistry<Q, H>,
        kind: QueueEventKind,
        listener: Listener<H>,
    ) -> SubscriptionId {
        let wrappers = queues
            .iter()
            .map(|(_, handle)| handle.on(kind, wrap(handle, &listener)))
            .collect();

        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id, Registration { kind, wrappers });

        tracing::debug!(
            subscription = %id,
            event = %kind,
            queues = queues.len(),
            "Listener attached"
        );
        id
    }

    /// Attach `listener` for `kind` on every queue for a single call each.
    ///
    /// Nothing is recorded; the engine drops each wrapper after it fires.
    pub fn attach_once<Q: QueueName, H: QueueHandle>(
        &self,
        queues: &QueueRegistry<Q, H>,
        kind: QueueEventKind,
        listener: Listener<H>,
    ) {
        for (_, handle) in queues.iter() {
            handle.once(kind, wrap(handle, &listener));
        }
    }

    /// Detach every wrapper recorded for `id`.
    ///
    /// Fails with `NotRegistered` when `id` is unknown, already detached, or
    /// was registered for a different kind.
    pub fn detach<Q: QueueName, H: QueueHandle>(
        &self,
        queues: &QueueRegistry<Q, H>,
        kind: QueueEventKind,
        id: SubscriptionId,
    ) -> ManagerResult<()> {
        let registration = {
            let mut registrations = self.registrations.lock().unwrap_or_else(|e| e.into_inner());
            match registrations.get(&id) {
                Some(registration) if registration.kind == kind => registrations.remove(&id),
                _ => None,
            }
        };
        let Some(registration) = registration else {
            return Err(ManagerError::NotRegistered { kind });
        };

        for ((name, handle), wrapper) in queues.iter().zip(registration.wrappers) {
            if !handle.off(kind, wrapper) {
                tracing::warn!(queue = %name, subscription = %id, "Listener was already detached");
            }
        }

        tracing::debug!(subscription = %id, event = %kind, "Listener detached");
        Ok(())
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.registrations
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Adapt `listener` to a single queue's callback shape.
///
/// The wrapper holds the queue weakly; the queue owns the wrapper.
fn wrap<H: QueueHandle>(handle: &Arc<H>, listener: &Listener<H>) -> EventCallback {
    let queue = Arc::downgrade(handle);
    let listener = listener.clone();
    Arc::new(move |event: &QueueEvent| {
        if let Some(queue) = queue.upgrade() {
            listener(&queue, event);
        }
    })
}
