//! Cache-aside route resolution.
//!
//! [`CachedRouteResolver`] keys cached routes by the origin's spatial bucket
//! and the destination identity. Misses are computed synchronously and
//! written back on a detached task so the caller never waits on the cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::domain::cache_access::{self, CacheRead};
use crate::domain::ports::{
    CacheMetrics, CacheTier, NoOpCacheMetrics, RouteCache, RouteCacheKey, RouteComputer,
    RouteResolveError, RouteResolver,
};
use crate::domain::{DestinationIdentity, RouteQuery, RouteResult, SpatialBucket};

/// Resolver tuning: entry lifetime, cache deadlines, and write admission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteResolverConfig {
    /// Lifetime of a cached route.
    pub cache_ttl: Duration,
    /// Deadline for a cache read before it counts as a miss.
    pub cache_read_timeout: Duration,
    /// Deadline for a detached cache write.
    pub cache_write_timeout: Duration,
    /// Detached writes allowed in flight at once; further writes are skipped.
    pub max_pending_writes: usize,
}

impl Default for RouteResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(120),
            cache_read_timeout: Duration::from_secs(5),
            cache_write_timeout: Duration::from_secs(5),
            max_pending_writes: 64,
        }
    }
}

/// Route resolver serving cached routes before computing new ones.
pub struct CachedRouteResolver<C: ?Sized, K: ?Sized> {
    computer: Arc<C>,
    cache: Arc<K>,
    metrics: Arc<dyn CacheMetrics>,
    config: RouteResolverConfig,
    write_permits: Arc<Semaphore>,
}

impl<C: ?Sized, K: ?Sized> CachedRouteResolver<C, K> {
    /// Build a resolver over a route computer and a route cache.
    pub fn new(computer: Arc<C>, cache: Arc<K>, config: RouteResolverConfig) -> Self {
        let write_permits = Arc::new(Semaphore::new(config.max_pending_writes.max(1)));
        Self {
            computer,
            cache,
            metrics: Arc::new(NoOpCacheMetrics),
            config,
            write_permits,
        }
    }

    /// Report hits, misses, and write failures to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl<C: ?Sized, K> CachedRouteResolver<C, K>
where
    K: RouteCache + ?Sized + 'static,
{
    async fn read_cached(&self, key: &RouteCacheKey) -> Option<RouteResult> {
        let storage_key = key.storage_key();
        let read = cache_access::bounded_read(
            CacheTier::Route,
            &storage_key,
            self.config.cache_read_timeout,
            self.cache.get(key),
        )
        .await;
        cache_access::record_read(self.metrics.as_ref(), CacheTier::Route, &read).await;
        match read {
            CacheRead::Hit(route) => {
                debug!(key = %storage_key, "route cache hit");
                Some(route)
            }
            CacheRead::Miss | CacheRead::Unavailable => None,
        }
    }

    /// Persist `route` on a detached task bounded by the write timeout.
    ///
    /// The task owns everything it touches, so dropping the caller's future
    /// does not cancel it.
    async fn spawn_write_back(&self, key: RouteCacheKey, route: RouteResult) {
        let Ok(permit) = Arc::clone(&self.write_permits).try_acquire_owned() else {
            warn!(
                key = %key,
                max_pending_writes = self.config.max_pending_writes,
                "route cache write skipped; too many writes in flight"
            );
            cache_access::record_write_failure(self.metrics.as_ref(), CacheTier::Route).await;
            return;
        };

        let cache = Arc::clone(&self.cache);
        let metrics = Arc::clone(&self.metrics);
        let ttl = self.config.cache_ttl;
        let deadline = self.config.cache_write_timeout;
        tokio::spawn(async move {
            let _permit = permit;
            let outcome = tokio::time::timeout(deadline, cache.put(&key, &route, ttl)).await;
            let failure = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(error)) => error.to_string(),
                Err(_) => format!("timed out after {}ms", deadline.as_millis()),
            };
            warn!(key = %key, error = %failure, "route cache write failed");
            cache_access::record_write_failure(metrics.as_ref(), CacheTier::Route).await;
        });
    }
}

#[async_trait]
impl<C, K> RouteResolver for CachedRouteResolver<C, K>
where
    C: RouteComputer + ?Sized,
    K: RouteCache + ?Sized + 'static,
{
    async fn resolve(
        &self,
        query: &RouteQuery,
        destination: DestinationIdentity,
    ) -> Result<RouteResult, RouteResolveError> {
        let bucket = SpatialBucket::for_origin(query.origin)
            .map_err(|error| RouteResolveError::bucket(error.to_string()))?;
        let key = RouteCacheKey::new(bucket, destination);

        if let Some(route) = self.read_cached(&key).await {
            return Ok(route);
        }

        let route = self
            .computer
            .compute(query)
            .await
            .map_err(|error| RouteResolveError::computation(error.to_string()))?;

        self.spawn_write_back(key, route.clone()).await;
        Ok(route)
    }
}

#[cfg(test)]
#[path = "route_resolver_tests.rs"]
mod tests;
