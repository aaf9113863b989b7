//! Two-level rate cache: process memory in front of the persisted store.

use crate::db::Repository;
use crate::domain::Rate;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

/// Cache of resolved rates keyed by `TYPE:SYMBOL:YYYY-MM-DD`.
///
/// Created once per process and shared by every resolver. Store errors are
/// logged and treated as misses so rate lookups never fail because of the
/// cache.
#[derive(Debug, Default)]
pub struct RateCache {
    memory: RwLock<HashMap<String, Rate>>,
    store: Option<Arc<Repository>>,
    inflight: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

/// Exclusive hold on one cache key, see [`RateCache::lock_key`].
///
/// Dropping it frees the key; the key's slot is removed once nobody else
/// waits on it.
pub struct KeyGuard<'a> {
    cache: &'a RateCache,
    key: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.held.take();
        self.cache.release_key(&self.key);
    }
}

impl RateCache {
    /// Memory-only cache.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Cache backed by the persisted `rate_cache` table.
    pub fn persistent(store: Arc<Repository>) -> Self {
        Self {
            store: Some(store),
            ..Self::default()
        }
    }

    pub async fn get(&self, key: &str) -> Option<Rate> {
        if let Some(rate) = self.memory_get(key) {
            return Some(rate);
        }

        let store = self.store.as_ref()?;
        match store.get_cached_rate(key).await {
            Ok(Some(rate)) => {
                debug!("Rate cache hit (store) for {}", key);
                self.memory_put(key, rate.clone());
                Some(rate)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Rate cache read failed for {}: {}", key, e);
                None
            }
        }
    }

    pub async fn put(&self, rate: &Rate) {
        let key = rate.cache_key();
        self.memory_put(&key, rate.clone());
        if let Some(store) = &self.store {
            if let Err(e) = store.save_rate(rate, &key).await {
                warn!("Rate cache write failed for {}: {}", key, e);
            }
        }
    }

    /// Serialize resolution of one key. Holders of the guard are the only
    /// caller allowed to go to the providers for that key.
    pub async fn lock_key(&self, key: &str) -> KeyGuard<'_> {
        let slot = {
            let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
            inflight
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        KeyGuard {
            cache: self,
            key: key.to_string(),
            held: Some(slot.lock_owned().await),
        }
    }

    fn release_key(&self, key: &str) {
        let mut inflight = self.inflight.lock().unwrap_or_else(PoisonError::into_inner);
        // only the map still references an idle slot
        if inflight
            .get(key)
            .map_or(false, |slot| Arc::strong_count(slot) == 1)
        {
            inflight.remove(key);
        }
    }

    /// Drop all in-memory entries. Persisted entries are kept.
    pub async fn clear(&self) {
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn memory_get(&self, key: &str) -> Option<Rate> {
        self.memory
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn memory_put(&self, key: &str, rate: Rate) {
        self.memory
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), rate);
    }
}
