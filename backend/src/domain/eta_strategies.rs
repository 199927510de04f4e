//! Arrival-time strategies.
//!
//! [`SimpleEtaStrategy`] is a deterministic, data-independent placeholder
//! driven by a peak-hour schedule. [`TelemetryEtaStrategy`] estimates from
//! recent vehicle positions and reports `NoDataAvailable` when none are
//! fresh, which lets the resolver fall back to the schedule.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeDelta, Timelike};
use mockable::Clock;
use thiserror::Error;

use crate::domain::ports::{
    EtaStrategy, EtaStrategyError, StopLookup, VehiclePositionSource,
};
use crate::domain::{EtaEstimate, EtaSource, StopId, URBAN_FALLBACK_SPEED_MPS, haversine_meters};

/// Source tag of [`SimpleEtaStrategy`].
pub const SIMPLE_SOURCE: &str = "simple";
/// Source tag of [`TelemetryEtaStrategy`].
pub const TELEMETRY_SOURCE: &str = "gps";

/// Base waits selected by local hour.
///
/// ## Invariants
/// - Every peak hour lies in `0..=23`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaSchedule {
    off_peak_base_seconds: u32,
    peak_base_seconds: u32,
    peak_hours: BTreeSet<u32>,
}

/// Validation errors for [`EtaSchedule`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EtaScheduleError {
    /// A peak hour was outside `0..=23`.
    #[error("peak hour {hour} is outside 0..=23")]
    HourOutOfRange { hour: u32 },
}

impl EtaSchedule {
    /// Build a schedule from base waits and the set of peak hours.
    ///
    /// # Examples
    /// ```
    /// use transit_backend::domain::EtaSchedule;
    ///
    /// let schedule = EtaSchedule::new(180, 360, [7, 8, 17, 18]).expect("valid hours");
    /// assert_eq!(schedule.base_for_hour(8), 360);
    /// assert_eq!(schedule.base_for_hour(12), 180);
    /// assert!(EtaSchedule::new(180, 360, [24]).is_err());
    /// ```
    pub fn new(
        off_peak_base_seconds: u32,
        peak_base_seconds: u32,
        peak_hours: impl IntoIterator<Item = u32>,
    ) -> Result<Self, EtaScheduleError> {
        let peak_hours = peak_hours
            .into_iter()
            .map(|hour| {
                if hour > 23 {
                    Err(EtaScheduleError::HourOutOfRange { hour })
                } else {
                    Ok(hour)
                }
            })
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(Self {
            off_peak_base_seconds,
            peak_base_seconds,
            peak_hours,
        })
    }

    /// Base wait for the given local hour.
    pub fn base_for_hour(&self, hour: u32) -> u32 {
        if self.peak_hours.contains(&hour) {
            self.peak_base_seconds
        } else {
            self.off_peak_base_seconds
        }
    }

    /// Configured peak hours, ascending.
    pub fn peak_hours(&self) -> impl Iterator<Item = u32> + '_ {
        self.peak_hours.iter().copied()
    }
}

impl Default for EtaSchedule {
    fn default() -> Self {
        Self {
            off_peak_base_seconds: 180,
            peak_base_seconds: 360,
            peak_hours: BTreeSet::from([7, 8, 17, 18]),
        }
    }
}

/// Schedule-based strategy: `base + stop_id mod 60` seconds.
#[derive(Clone)]
pub struct SimpleEtaStrategy {
    schedule: EtaSchedule,
    clock: Arc<dyn Clock>,
}

impl SimpleEtaStrategy {
    /// Create a strategy reading the local hour from `clock`.
    pub fn new(schedule: EtaSchedule, clock: Arc<dyn Clock>) -> Self {
        Self { schedule, clock }
    }

    /// Seconds for `stop_id` at the given local hour.
    pub fn seconds_at_hour(&self, stop_id: StopId, hour: u32) -> u32 {
        // Stop ids are positive, so the remainder is in 0..60.
        let offset = stop_id.get().rem_euclid(60).unsigned_abs();
        self.schedule.base_for_hour(hour).saturating_add(offset)
    }
}

#[async_trait]
impl EtaStrategy for SimpleEtaStrategy {
    async fn estimate(&self, stop_id: StopId) -> Result<EtaEstimate, EtaStrategyError> {
        let hour = self.clock.local().hour();
        Ok(EtaEstimate::new(
            self.seconds_at_hour(stop_id, hour),
            EtaSource::new(SIMPLE_SOURCE),
        ))
    }
}

/// Telemetry strategy: straight-line travel time of the nearest vehicle with
/// a recent position report.
pub struct TelemetryEtaStrategy<P: ?Sized, L: ?Sized> {
    positions: Arc<P>,
    stops: Arc<L>,
    clock: Arc<dyn Clock>,
    freshness: Duration,
}

impl<P: ?Sized, L: ?Sized> TelemetryEtaStrategy<P, L> {
    /// Default window in which a position report counts as live.
    pub const DEFAULT_FRESHNESS: Duration = Duration::from_secs(300);

    /// Create a strategy with the default freshness window.
    pub fn new(positions: Arc<P>, stops: Arc<L>, clock: Arc<dyn Clock>) -> Self {
        Self {
            positions,
            stops,
            clock,
            freshness: Self::DEFAULT_FRESHNESS,
        }
    }

    /// Override the freshness window.
    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = freshness;
        self
    }
}

#[async_trait]
impl<P, L> EtaStrategy for TelemetryEtaStrategy<P, L>
where
    P: VehiclePositionSource + ?Sized,
    L: StopLookup + ?Sized,
{
    async fn estimate(&self, stop_id: StopId) -> Result<EtaEstimate, EtaStrategyError> {
        let stop = self
            .stops
            .find_stop(stop_id)
            .await
            .map_err(|err| EtaStrategyError::failed(format!("stop {stop_id}: {err}")))?
            .ok_or_else(|| EtaStrategyError::failed(format!("stop {stop_id} not found")))?;
        let positions = self
            .positions
            .positions_for_stop(stop_id)
            .await
            .map_err(|err| EtaStrategyError::failed(format!("stop {stop_id}: {err}")))?;

        let window = TimeDelta::from_std(self.freshness).unwrap_or(TimeDelta::MAX);
        let cutoff = self
            .clock
            .utc()
            .checked_sub_signed(window)
            .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC);

        positions
            .iter()
            .filter(|position| position.reported_at >= cutoff)
            .map(|position| {
                let metres = haversine_meters(position.coordinate, stop.coordinate);
                (metres / URBAN_FALLBACK_SPEED_MPS).ceil() as u32
            })
            .min()
            .map(|seconds| EtaEstimate::new(seconds, EtaSource::new(TELEMETRY_SOURCE)))
            .ok_or_else(|| {
                EtaStrategyError::no_data_available(format!(
                    "no vehicle reported near stop {stop_id} in the last {}s",
                    self.freshness.as_secs()
                ))
            })
    }
}

#[cfg(test)]
#[path = "eta_strategies_tests.rs"]
mod tests;
