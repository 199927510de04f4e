//! Route query and result types, stop identity, and the straight-line
//! estimate used when the upstream routing API is unavailable.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::geo::{Coordinate, haversine_meters};

/// Assumed urban travel speed for degraded estimates: 30 km/h in m/s.
pub const URBAN_FALLBACK_SPEED_MPS: f64 = 30.0 / 3.6;

/// Positive transit stop identifier.
///
/// # Examples
/// ```
/// use transit_backend::domain::StopId;
///
/// let id = StopId::new(42).expect("positive id");
/// assert_eq!(id.get(), 42);
/// assert!(StopId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub struct StopId(i32);

/// Validation error for [`StopId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("stop id must be positive, got {value}")]
pub struct StopIdValidationError {
    /// Rejected raw value.
    pub value: i32,
}

impl StopId {
    /// Validate a raw identifier.
    pub fn new(value: i32) -> Result<Self, StopIdValidationError> {
        if value <= 0 {
            return Err(StopIdValidationError { value });
        }
        Ok(Self(value))
    }

    /// Raw identifier value.
    pub fn get(self) -> i32 {
        self.0
    }
}

impl TryFrom<i32> for StopId {
    type Error = StopIdValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StopId> for i32 {
    fn from(value: StopId) -> Self {
        value.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stop record returned by the stop lookup port.
#[derive(Debug, Clone, PartialEq)]
pub struct StopLocation {
    /// Stop identifier.
    pub id: StopId,
    /// Human-readable stop name.
    pub name: String,
    /// Stop position.
    pub coordinate: Coordinate,
}

/// Origin and destination of one route computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteQuery {
    /// Rider position.
    pub origin: Coordinate,
    /// Target position, usually a stop.
    pub destination: Coordinate,
}

impl RouteQuery {
    /// Build a query between two coordinates.
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

/// Destination identity folded into route cache keys.
///
/// Passed explicitly alongside a [`RouteQuery`]. Calls that cannot name a
/// stop share the single [`DestinationIdentity::Unspecified`] slot per origin
/// bucket regardless of their actual destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DestinationIdentity {
    /// Route ends at a known transit stop.
    Stop(StopId),
    /// No identity supplied; keyed under the sentinel slot.
    Unspecified,
}

impl DestinationIdentity {
    /// Cache key component: the stop id, or `0` for the sentinel slot.
    ///
    /// Stop ids are strictly positive so `0` never collides with a stop.
    pub fn key_component(self) -> i32 {
        match self {
            Self::Stop(stop_id) => stop_id.get(),
            Self::Unspecified => 0,
        }
    }
}

/// Computed route between two coordinates.
///
/// ## Invariants
/// - When `degraded` is true, `encoded_path` is empty and distance/duration
///   come from the great-circle estimate; both are zero only for identical
///   endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteResult {
    /// Encoded polyline, opaque to this crate.
    pub encoded_path: String,
    /// Route length in metres.
    pub distance_meters: u32,
    /// Travel time in seconds.
    pub duration_seconds: u32,
    /// Set when the result is a straight-line estimate.
    pub degraded: bool,
}

impl RouteResult {
    /// Straight-line estimate travelled at [`URBAN_FALLBACK_SPEED_MPS`].
    ///
    /// Distance and duration round up to whole units.
    ///
    /// # Examples
    /// ```
    /// use transit_backend::domain::{Coordinate, RouteQuery, RouteResult};
    ///
    /// let origin = Coordinate::new(0.0, 0.0).expect("valid");
    /// let stop = Coordinate::new(0.0, 0.01).expect("valid");
    /// let estimate = RouteResult::straight_line(&RouteQuery::new(origin, stop));
    /// assert!(estimate.degraded);
    /// assert!(estimate.encoded_path.is_empty());
    /// assert_eq!(estimate.distance_meters, 1_112);
    /// assert_eq!(estimate.duration_seconds, 134);
    /// ```
    pub fn straight_line(query: &RouteQuery) -> Self {
        let metres = haversine_meters(query.origin, query.destination);
        let seconds = metres / URBAN_FALLBACK_SPEED_MPS;
        Self {
            encoded_path: String::new(),
            distance_meters: saturating_whole_units(metres),
            duration_seconds: saturating_whole_units(seconds),
            degraded: true,
        }
    }
}

fn saturating_whole_units(value: f64) -> u32 {
    // Float-to-int `as` saturates; the ceiling keeps sub-unit values above 0.
    value.ceil() as u32
}
