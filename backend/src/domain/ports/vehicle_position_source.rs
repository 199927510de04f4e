//! Driven port for recent vehicle positions used by telemetry ETAs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::define_port_error;
use crate::domain::{Coordinate, StopId};

/// Latest reported position of a vehicle serving a stop.
#[derive(Debug, Clone, PartialEq)]
pub struct VehiclePosition {
    /// Vehicle identifier.
    pub vehicle_id: i32,
    /// Reported location.
    pub coordinate: Coordinate,
    /// When the vehicle reported this position.
    pub reported_at: DateTime<Utc>,
}

define_port_error! {
    /// Errors raised while reading vehicle positions.
    pub enum VehiclePositionSourceError {
        /// Store connection could not be established.
        Connection {
            /// Failure detail.
            message: String,
        } => "vehicle position connection failed: {message}",
        /// Query failed during execution.
        Query {
            /// Failure detail.
            message: String,
        } => "vehicle position query failed: {message}",
    }
}

/// Port listing the latest position of each vehicle on routes serving a stop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VehiclePositionSource: Send + Sync {
    /// Latest position per active vehicle; staleness is judged by the caller.
    async fn positions_for_stop(
        &self,
        stop_id: StopId,
    ) -> Result<Vec<VehiclePosition>, VehiclePositionSourceError>;
}

/// Fixture source with no vehicles reporting.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureVehiclePositionSource;

#[async_trait]
impl VehiclePositionSource for FixtureVehiclePositionSource {
    async fn positions_for_stop(
        &self,
        _stop_id: StopId,
    ) -> Result<Vec<VehiclePosition>, VehiclePositionSourceError> {
        Ok(Vec::new())
    }
}
