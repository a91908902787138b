// src/utils/cache.rs

use std::{
    collections::HashMap,
    future::Future,
    hash::Hash,
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use tokio::sync::OnceCell;

struct Slot<V> {
    cell: OnceCell<(V, Instant)>,
}

/// Short-lived memo keyed by query.
///
/// Concurrent callers asking for the same key while it is being computed all
/// await the same computation. Entries expire after `ttl`; failed computations
/// are not stored.
pub struct TtlCache<K, V> {
    ttl: Duration,
    slots: Mutex<HashMap<K, Arc<Slot<V>>>>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &K) -> Arc<Slot<V>> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get(key) {
            let expired = slot
                .cell
                .get()
                .is_some_and(|(_, stored_at)| stored_at.elapsed() >= self.ttl);
            if !expired {
                return slot.clone();
            }
        }
        let slot = Arc::new(Slot { cell: OnceCell::new() });
        slots.insert(key.clone(), slot.clone());
        slot
    }

    /// Returns the cached value for `key`, computing it with `init` when absent or stale.
    pub async fn get_or_try_init<F, Fut, E>(&self, key: K, init: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = self.slot(&key);
        let result = slot
            .cell
            .get_or_try_init(|| async move { init().await.map(|v| (v, Instant::now())) })
            .await;

        match result {
            Ok((value, _)) => Ok(value.clone()),
            Err(e) => {
                self.discard_failed(&key, &slot);
                Err(e)
            }
        }
    }

    /// Drops `slot` if it is still the empty entry for `key`.
    fn discard_failed(&self, key: &K, slot: &Arc<Slot<V>>) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if slots
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && current.cell.get().is_none())
        {
            slots.remove(key);
        }
    }

    pub fn invalidate(&self, key: &K) {
        self.slots
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn clear(&self) {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}
