//! Shared test doubles for unit and integration tests.
//!
//! Compiled under `cfg(test)` and the `test-support` feature.

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use mockable::Clock;

use crate::domain::ports::{
    CacheMetrics, CacheMetricsError, CacheTier, StopLookup, StopLookupError,
};
use crate::domain::{StopId, StopLocation};

/// Clock pinned to a settable instant.
pub struct MutableClock(Mutex<DateTime<Utc>>);

impl MutableClock {
    /// Clock reading `now` until advanced.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self(Mutex::new(now))
    }

    /// Move the clock forward by `delta`.
    ///
    /// # Panics
    ///
    /// Panics when `delta` does not fit a [`TimeDelta`].
    pub fn advance(&self, delta: Duration) {
        let delta = match TimeDelta::from_std(delta) {
            Ok(delta) => delta,
            Err(error) => {
                panic!("failed to convert Duration to TimeDelta: {error}; delta={delta:?}")
            }
        };
        *self.lock_clock() += delta;
    }

    fn lock_clock(&self) -> std::sync::MutexGuard<'_, DateTime<Utc>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("clock mutex"),
        }
    }
}

impl Clock for MutableClock {
    fn local(&self) -> DateTime<Local> {
        self.utc().with_timezone(&Local)
    }

    fn utc(&self) -> DateTime<Utc> {
        *self.lock_clock()
    }
}

/// Instant whose local-time hour is `hour`, on a date clear of DST changes.
pub fn at_local_hour(hour: u32) -> DateTime<Utc> {
    match Local.with_ymd_and_hms(2026, 1, 14, hour, 30, 0).earliest() {
        Some(local) => local.with_timezone(&Utc),
        None => panic!("local time {hour}:30 does not exist"),
    }
}

/// Cache metric kinds captured by [`RecordingCacheMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEvent {
    /// Cached value served.
    Hit,
    /// Nothing usable cached.
    Miss,
    /// Write-back failed or timed out.
    WriteFailure,
}

/// Metrics sink remembering every observation.
#[derive(Debug, Default)]
pub struct RecordingCacheMetrics(Mutex<Vec<(CacheEvent, CacheTier)>>);

impl RecordingCacheMetrics {
    /// Number of `event` observations recorded for `tier`.
    pub fn count(&self, event: CacheEvent, tier: CacheTier) -> usize {
        self.lock_events()
            .iter()
            .filter(|entry| **entry == (event, tier))
            .count()
    }

    fn push(&self, event: CacheEvent, tier: CacheTier) -> Result<(), CacheMetricsError> {
        self.lock_events().push((event, tier));
        Ok(())
    }

    fn lock_events(&self) -> std::sync::MutexGuard<'_, Vec<(CacheEvent, CacheTier)>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(_) => panic!("metrics mutex"),
        }
    }
}

#[async_trait]
impl CacheMetrics for RecordingCacheMetrics {
    async fn record_hit(&self, tier: CacheTier) -> Result<(), CacheMetricsError> {
        self.push(CacheEvent::Hit, tier)
    }

    async fn record_miss(&self, tier: CacheTier) -> Result<(), CacheMetricsError> {
        self.push(CacheEvent::Miss, tier)
    }

    async fn record_write_failure(&self, tier: CacheTier) -> Result<(), CacheMetricsError> {
        self.push(CacheEvent::WriteFailure, tier)
    }
}

/// Stop lookup over a fixed list of stops, counting calls.
#[derive(Debug, Default)]
pub struct InMemoryStopLookup {
    stops: Vec<StopLocation>,
    calls: Mutex<usize>,
}

impl InMemoryStopLookup {
    /// Lookup answering for `stops` only.
    pub fn new(stops: impl IntoIterator<Item = StopLocation>) -> Self {
        Self {
            stops: stops.into_iter().collect(),
            calls: Mutex::new(0),
        }
    }

    /// Number of `find_stop` calls so far.
    pub fn calls(&self) -> usize {
        match self.calls.lock() {
            Ok(calls) => *calls,
            Err(_) => panic!("lookup mutex"),
        }
    }
}

#[async_trait]
impl StopLookup for InMemoryStopLookup {
    async fn find_stop(&self, stop_id: StopId) -> Result<Option<StopLocation>, StopLookupError> {
        match self.calls.lock() {
            Ok(mut calls) => *calls += 1,
            Err(_) => panic!("lookup mutex"),
        }
        Ok(self.stops.iter().find(|stop| stop.id == stop_id).cloned())
    }
}
