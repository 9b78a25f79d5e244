use std::{
    collections::HashMap,
    future::Future,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
    time::Instant,
};

use tokio::sync::OnceCell;

use crate::types::Instance;

/// A constructed singleton and when it was created
#[derive(Debug, Clone)]
pub(crate) struct CachedInstance {
    pub(crate) key: String,
    pub(crate) instance: Instance,
    pub(crate) created_at: Instant,
    /// Breaks ties between equal timestamps
    pub(crate) sequence: u64,
}

type Slot = Arc<OnceCell<CachedInstance>>;

/// Singleton instances of a container
///
/// Each key owns a [`OnceCell`], so concurrent first resolutions of the same key
/// construct at most one instance.
#[derive(Default)]
pub(crate) struct InstanceCache {
    slots: Mutex<HashMap<String, Slot>>,
    sequence: AtomicU64,
}

impl InstanceCache {
    pub(crate) fn get(&self, key: &str) -> Option<Instance> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .get(key)
            .and_then(|slot| slot.get())
            .map(|cached| cached.instance.clone())
    }

    /// Returns the cached instance for `key`, constructing it first if needed
    ///
    /// A failed construction leaves the slot empty, the next call tries again.
    pub(crate) async fn get_or_try_init<F, Fut, E>(&self, key: &str, construct: F) -> Result<Instance, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Instance, E>>,
    {
        let slot = self.slot(key);
        let cached = slot
            .get_or_try_init(|| async {
                let instance = construct().await?;
                let cached = CachedInstance {
                    key: key.to_string(),
                    instance,
                    created_at: Instant::now(),
                    sequence: self.sequence.fetch_add(1, Ordering::Relaxed),
                };
                tracing::debug!("Cached instance of '{}'", cached.key);
                Ok(cached)
            })
            .await?;
        Ok(cached.instance.clone())
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys of all constructed singletons, oldest first
    pub(crate) fn keys(&self) -> Vec<String> {
        let mut entries = self.entries();
        entries.reverse();
        entries.into_iter().map(|cached| cached.key).collect()
    }

    /// Removes every entry, returning the constructed ones newest first
    pub(crate) fn drain(&self) -> Vec<CachedInstance> {
        let slots = std::mem::take(&mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner));
        sort_newest_first(slots.into_values().filter_map(|slot| slot.get().cloned()).collect())
    }

    fn entries(&self) -> Vec<CachedInstance> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        sort_newest_first(slots.values().filter_map(|slot| slot.get().cloned()).collect())
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.to_string()).or_default().clone()
    }
}

fn sort_newest_first(mut entries: Vec<CachedInstance>) -> Vec<CachedInstance> {
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then(b.sequence.cmp(&a.sequence))
    });
    entries
}
