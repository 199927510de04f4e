//! Tiered arrival-time resolution: cache, primary strategy, then an
//! optional fallback strategy.
//!
//! Each tier is attempted at most once per call. Only the primary's
//! `NoDataAvailable` signal engages the fallback; any other primary failure
//! propagates unchanged.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::cache_access::{self, CacheRead};
use crate::domain::ports::{
    CacheMetrics, CacheTier, EtaCache, EtaCacheKey, EtaStrategy, EtaStrategyError,
    NoOpCacheMetrics,
};
use crate::domain::{Error, EtaResult, EtaSource, StopId, StopIdValidationError};

/// Resolver tuning: entry lifetime and cache deadlines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaResolverConfig {
    /// Lifetime of a cached estimate.
    pub cache_ttl: Duration,
    /// Deadline for a cache read before it counts as a miss.
    pub cache_read_timeout: Duration,
    /// Deadline for the best-effort cache write.
    pub cache_write_timeout: Duration,
}

impl Default for EtaResolverConfig {
    fn default() -> Self {
        Self {
            cache_ttl: Duration::from_secs(60),
            cache_read_timeout: Duration::from_secs(5),
            cache_write_timeout: Duration::from_secs(5),
        }
    }
}

/// Failures of [`EtaResolver::estimate`].
#[derive(Debug, Error)]
pub enum EtaError {
    /// Stop identifier was not positive; no strategy was invoked.
    #[error("invalid stop id {stop_id}")]
    InvalidStopId {
        /// Identifier as supplied.
        stop_id: i32,
        /// Underlying failure.
        #[source]
        source: StopIdValidationError,
    },
    /// The primary strategy had no data and no fallback is configured.
    #[error("no arrival data available for stop {stop_id}")]
    NoDataAvailable {
        /// Stop being resolved.
        stop_id: StopId,
        /// Underlying failure.
        #[source]
        source: EtaStrategyError,
    },
    /// The primary strategy failed outright.
    #[error("primary eta strategy failed for stop {stop_id}")]
    Primary {
        /// Stop being resolved.
        stop_id: StopId,
        /// Underlying failure.
        #[source]
        source: EtaStrategyError,
    },
    /// The fallback strategy failed after the primary had no data.
    #[error("fallback eta strategy failed for stop {stop_id}")]
    Fallback {
        /// Stop being resolved.
        stop_id: StopId,
        /// Underlying failure.
        #[source]
        source: EtaStrategyError,
    },
}

impl From<EtaError> for Error {
    fn from(err: EtaError) -> Self {
        let message = err.to_string();
        match err {
            EtaError::InvalidStopId { stop_id, source } => Error::invalid_request(message)
                .with_details(json!({ "stopId": stop_id, "reason": source.to_string() })),
            EtaError::NoDataAvailable { stop_id, .. } => Error::service_unavailable(message)
                .with_details(json!({ "stopId": stop_id.get() })),
            EtaError::Fallback { stop_id, source } if source.is_no_data() => {
                Error::service_unavailable(message)
                    .with_details(json!({ "stopId": stop_id.get() }))
            }
            EtaError::Primary { source, .. } | EtaError::Fallback { source, .. } => {
                Error::internal(format!("{message}: {source}"))
            }
        }
    }
}

/// Cache-backed ETA resolver with an optional fallback strategy.
pub struct EtaResolver<P: ?Sized, K: ?Sized> {
    primary: Arc<P>,
    fallback: Option<Arc<dyn EtaStrategy>>,
    cache: Arc<K>,
    metrics: Arc<dyn CacheMetrics>,
    config: EtaResolverConfig,
}

impl<P: ?Sized, K: ?Sized> EtaResolver<P, K> {
    /// Build a resolver with default configuration and no fallback.
    pub fn new(primary: Arc<P>, cache: Arc<K>) -> Self {
        Self {
            primary,
            fallback: None,
            cache,
            metrics: Arc::new(NoOpCacheMetrics),
            config: EtaResolverConfig::default(),
        }
    }

    /// Consult `fallback` when the primary strategy reports no data.
    pub fn with_fallback(mut self, fallback: Arc<dyn EtaStrategy>) -> Self {
        self.fallback = Some(fallback);
        self
    }

    /// Replace the configuration.
    pub fn with_config(mut self, config: EtaResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Report hits, misses, and write failures to `metrics`.
    pub fn with_metrics(mut self, metrics: Arc<dyn CacheMetrics>) -> Self {
        self.metrics = metrics;
        self
    }
}

impl<P, K> EtaResolver<P, K>
where
    P: EtaStrategy + ?Sized,
    K: EtaCache + ?Sized,
{
    /// Estimate seconds until the next arrival at `stop_id`.
    ///
    /// The result's source is `cache` on a hit, the primary's tag on a miss,
    /// or the fallback's tag with the `_fallback` suffix.
    pub async fn estimate(&self, stop_id: i32) -> Result<EtaResult, EtaError> {
        let stop = StopId::new(stop_id)
            .map_err(|source| EtaError::InvalidStopId { stop_id, source })?;
        let key = EtaCacheKey::new(stop);

        if let Some(seconds) = self.read_cached(&key).await {
            return Ok(EtaResult {
                seconds,
                source: EtaSource::cache(),
            });
        }

        let result = self.estimate_uncached(stop).await?;
        self.write_back(&key, result.seconds).await;
        Ok(result)
    }

    async fn estimate_uncached(&self, stop_id: StopId) -> Result<EtaResult, EtaError> {
        let no_data = match self.primary.estimate(stop_id).await {
            Ok(estimate) => return Ok(estimate.into()),
            Err(source) if source.is_no_data() => source,
            Err(source) => return Err(EtaError::Primary { stop_id, source }),
        };

        let Some(fallback) = &self.fallback else {
            return Err(EtaError::NoDataAvailable {
                stop_id,
                source: no_data,
            });
        };

        info!(stop_id = stop_id.get(), reason = %no_data, "eta fallback engaged");
        let estimate = fallback
            .estimate(stop_id)
            .await
            .map_err(|source| EtaError::Fallback { stop_id, source })?;
        Ok(EtaResult {
            seconds: estimate.seconds,
            source: estimate.source.as_fallback(),
        })
    }

    async fn read_cached(&self, key: &EtaCacheKey) -> Option<u32> {
        let read = cache_access::bounded_read(
            CacheTier::Eta,
            &key.storage_key(),
            self.config.cache_read_timeout,
            self.cache.get(key),
        )
        .await;
        cache_access::record_read(self.metrics.as_ref(), CacheTier::Eta, &read).await;
        match read {
            CacheRead::Hit(seconds) => Some(seconds),
            CacheRead::Miss | CacheRead::Unavailable => None,
        }
    }

    async fn write_back(&self, key: &EtaCacheKey, seconds: u32) {
        let deadline = self.config.cache_write_timeout;
        let outcome =
            tokio::time::timeout(deadline, self.cache.put(key, seconds, self.config.cache_ttl))
                .await;
        let failure = match outcome {
            Ok(Ok(())) => return,
            Ok(Err(error)) => error.to_string(),
            Err(_) => format!("timed out after {}ms", deadline.as_millis()),
        };
        warn!(key = %key, error = %failure, "eta cache write failed");
        cache_access::record_write_failure(self.metrics.as_ref(), CacheTier::Eta).await;
    }
}

#[cfg(test)]
#[path = "eta_resolver_tests.rs"]
mod tests;
