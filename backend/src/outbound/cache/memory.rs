//! In-process cache adapters with per-entry expiry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::Clock;

use crate::domain::RouteResult;
use crate::domain::ports::{
    EtaCache, EtaCacheError, EtaCacheKey, RouteCache, RouteCacheError, RouteCacheKey,
};

struct Entry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

struct Slots<V> {
    map: HashMap<String, Entry<V>>,
    next_expiry: Option<DateTime<Utc>>,
}

impl<V> Slots<V> {
    /// Drop every entry expired at `now` once the earliest deadline passes.
    fn sweep(&mut self, now: DateTime<Utc>) {
        if self.next_expiry.is_none_or(|deadline| now < deadline) {
            return;
        }
        self.map.retain(|_, entry| now < entry.expires_at);
        self.next_expiry = self.map.values().map(|entry| entry.expires_at).min();
    }
}

/// Mutex-guarded map whose entries expire against an injected clock.
///
/// Reads evict the key they touch; writes sweep the whole map so keys that
/// are never read again do not accumulate.
struct ExpiringMap<V> {
    slots: Mutex<Slots<V>>,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> ExpiringMap<V> {
    fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            slots: Mutex::new(Slots {
                map: HashMap::new(),
                next_expiry: None,
            }),
            clock,
        }
    }

    fn get(&self, key: &str) -> Result<Option<V>, String> {
        let now = self.clock.utc();
        let mut slots = self.lock()?;
        match slots.map.get(key) {
            Some(entry) if now < entry.expires_at => Ok(Some(entry.value.clone())),
            Some(_) => {
                slots.map.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    fn put(&self, key: String, value: V, ttl: Duration) -> Result<(), String> {
        let ttl = TimeDelta::from_std(ttl).map_err(|error| format!("invalid ttl: {error}"))?;
        let now = self.clock.utc();
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut slots = self.lock()?;
        slots.sweep(now);
        slots.next_expiry = Some(
            slots
                .next_expiry
                .map_or(expires_at, |deadline| deadline.min(expires_at)),
        );
        slots.map.insert(key, Entry { value, expires_at });
        Ok(())
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().map_or(0, |slots| slots.map.len())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Slots<V>>, String> {
        self.slots
            .lock()
            .map_err(|_| "cache mutex poisoned".to_owned())
    }
}

/// Process-local route cache.
pub struct InMemoryRouteCache(ExpiringMap<RouteResult>);

impl InMemoryRouteCache {
    /// Create an empty cache measuring expiry with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self(ExpiringMap::new(clock))
    }
}

#[async_trait]
impl RouteCache for InMemoryRouteCache {
    async fn get(&self, key: &RouteCacheKey) -> Result<Option<RouteResult>, RouteCacheError> {
        self.0
            .get(&key.storage_key())
            .map_err(RouteCacheError::backend)
    }

    async fn put(
        &self,
        key: &RouteCacheKey,
        route: &RouteResult,
        ttl: Duration,
    ) -> Result<(), RouteCacheError> {
        self.0
            .put(key.storage_key(), route.clone(), ttl)
            .map_err(RouteCacheError::backend)
    }
}

/// Process-local ETA cache.
pub struct InMemoryEtaCache(ExpiringMap<u32>);

impl InMemoryEtaCache {
    /// Create an empty cache measuring expiry with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self(ExpiringMap::new(clock))
    }
}

#[async_trait]
impl EtaCache for InMemoryEtaCache {
    async fn get(&self, key: &EtaCacheKey) -> Result<Option<u32>, EtaCacheError> {
        self.0.get(&key.storage_key()).map_err(EtaCacheError::backend)
    }

    async fn put(&self, key: &EtaCacheKey, seconds: u32, ttl: Duration) -> Result<(), EtaCacheError> {
        self.0
            .put(key.storage_key(), seconds, ttl)
            .map_err(EtaCacheError::backend)
    }
}
