//! Domain port surface for recording cache hit/miss and write outcomes.
use std::fmt;

use async_trait::async_trait;

use super::define_port_error;

/// Cache a metric refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// Route-to-stop cache.
    Route,
    /// Stop ETA cache.
    Eta,
}

impl CacheTier {
    /// Stable label for exporters and logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Eta => "eta",
        }
    }
}

impl fmt::Display for CacheTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

define_port_error! {
    /// Errors exposed when recording metrics.
    pub enum CacheMetricsError {
        /// Metric exporter rejected the write.
        Export {
            /// Failure detail.
            message: String,
        } => "cache metrics exporter failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CacheMetrics: Send + Sync {
    /// Record a cache hit.
    async fn record_hit(&self, tier: CacheTier) -> Result<(), CacheMetricsError>;

    /// Record a cache miss, including misses forced by read failures.
    async fn record_miss(&self, tier: CacheTier) -> Result<(), CacheMetricsError>;

    /// Record a cache write that failed, timed out, or was skipped.
    async fn record_write_failure(&self, tier: CacheTier) -> Result<(), CacheMetricsError>;
}

/// Metrics sink that discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCacheMetrics;

#[async_trait]
impl CacheMetrics for NoOpCacheMetrics {
    async fn record_hit(&self, _tier: CacheTier) -> Result<(), CacheMetricsError> {
        Ok(())
    }

    async fn record_miss(&self, _tier: CacheTier) -> Result<(), CacheMetricsError> {
        Ok(())
    }

    async fn record_write_failure(&self, _tier: CacheTier) -> Result<(), CacheMetricsError> {
        Ok(())
    }
}
