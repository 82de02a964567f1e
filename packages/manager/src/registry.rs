//! Registry of the live queue handles, keyed by queue name.

use std::collections::BTreeMap;
use std::sync::Arc;

use queue_core::{QueueConfigMap, QueueEngine, QueueHandle, QueueName, QueueOptions};

/// The queue handles a manager owns.
///
/// Built once from the configuration map; iteration order is the key order
/// of the queue names and never changes afterwards.
pub struct QueueRegistry<Q, H> {
    queues: BTreeMap<Q, Arc<H>>,
}

impl<Q: QueueName, H: QueueHandle> QueueRegistry<Q, H> {
    /// Create a handle for every enabled entry of `config`.
    ///
    /// `true` entries get `defaults` unmodified, option entries get `defaults`
    /// shallow-merged with their options, disabled entries are skipped.
    pub fn build<E>(engine: &E, config: &QueueConfigMap<Q>, defaults: &QueueOptions) -> Self
    where
        E: QueueEngine<Queue = H>,
    {
        let mut queues = BTreeMap::new();

        for (name, setting) in config {
            let Some(options) = setting.resolve(defaults) else {
                tracing::trace!(queue = %name, "Queue disabled, skipping");
                continue;
            };

            let handle = engine.create(&name.to_string(), options);
            tracing::debug!(queue = %name, "Queue created");
            queues.insert(name.clone(), Arc::new(handle));
        }

        Self { queues }
    }

    /// Get a queue handle by name.
    pub fn get(&self, name: &Q) -> Option<&Arc<H>> {
        self.queues.get(name)
    }

    /// Whether a queue with this name was created.
    pub fn contains(&self, name: &Q) -> bool {
        self.queues.contains_key(name)
    }

    /// Registered queue names, in registry order.
    pub fn names(&self) -> impl Iterator<Item = &Q> {
        self.queues.keys()
    }

    /// `(name, handle)` pairs, in registry order.
    pub fn iter(&self) -> impl Iterator<Item = (&Q, &Arc<H>)> {
        self.queues.iter()
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }
}
