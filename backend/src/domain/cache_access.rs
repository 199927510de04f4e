//! Shared cache-aside helpers for the route and ETA resolvers.
//!
//! Cache failures never reach callers: reads that error or exceed their
//! deadline count as misses, and metric export failures are only logged.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::domain::ports::{CacheMetrics, CacheMetricsError, CacheTier};

/// Outcome of a bounded cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CacheRead<T> {
    Hit(T),
    Miss,
    /// The read failed or timed out and is treated as a miss.
    Unavailable,
}

/// Await `read` for at most `deadline`, folding failures into
/// [`CacheRead::Unavailable`].
pub(crate) async fn bounded_read<T, E, F>(
    tier: CacheTier,
    storage_key: &str,
    deadline: Duration,
    read: F,
) -> CacheRead<T>
where
    E: Display,
    F: Future<Output = Result<Option<T>, E>>,
{
    match tokio::time::timeout(deadline, read).await {
        Ok(Ok(Some(value))) => CacheRead::Hit(value),
        Ok(Ok(None)) => CacheRead::Miss,
        Ok(Err(error)) => {
            debug!(%tier, key = storage_key, error = %error, "cache read failed; treating as miss");
            CacheRead::Unavailable
        }
        Err(_) => {
            debug!(
                %tier,
                key = storage_key,
                timeout_ms = deadline.as_millis() as u64,
                "cache read timed out; treating as miss"
            );
            CacheRead::Unavailable
        }
    }
}

/// Record the hit or miss for `read` on `metrics`.
pub(crate) async fn record_read<T, M>(metrics: &M, tier: CacheTier, read: &CacheRead<T>)
where
    M: CacheMetrics + ?Sized,
{
    let outcome = match read {
        CacheRead::Hit(_) => metrics.record_hit(tier).await,
        CacheRead::Miss | CacheRead::Unavailable => metrics.record_miss(tier).await,
    };
    log_metrics_failure(tier, outcome);
}

/// Report a failed, timed out, or skipped write on `metrics`.
pub(crate) async fn record_write_failure<M>(metrics: &M, tier: CacheTier)
where
    M: CacheMetrics + ?Sized,
{
    log_metrics_failure(tier, metrics.record_write_failure(tier).await);
}

fn log_metrics_failure(tier: CacheTier, outcome: Result<(), CacheMetricsError>) {
    if let Err(error) = outcome {
        debug!(%tier, error = %error, "failed to record cache metrics");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockCacheMetrics;

    #[tokio::test]
    async fn read_errors_become_unavailable() {
        let read = bounded_read::<u32, _, _>(CacheTier::Eta, "eta:v1:1", Duration::from_secs(1), async {
            Err::<Option<u32>, _>("connection reset")
        })
        .await;
        assert_eq!(read, CacheRead::Unavailable);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_reads_time_out() {
        let read = bounded_read(CacheTier::Route, "route:v1:x:0", Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok::<_, String>(Some(1_u32))
        })
        .await;
        assert_eq!(read, CacheRead::Unavailable);
    }

    #[tokio::test]
    async fn unavailable_reads_count_as_misses() {
        let mut metrics = MockCacheMetrics::new();
        metrics.expect_record_hit().times(0);
        metrics
            .expect_record_miss()
            .withf(|tier| *tier == CacheTier::Route)
            .times(1)
            .return_once(|_| Err(CacheMetricsError::export("exporter offline")));

        record_read::<u32, _>(&metrics, CacheTier::Route, &CacheRead::Unavailable).await;
    }
}
