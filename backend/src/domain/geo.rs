//! Geographic primitives: validated coordinates, great-circle distance, and
//! the spatial buckets used to share route cache entries between nearby
//! origins.

use std::fmt;

use thiserror::Error;

/// Mean Earth radius used by the spherical haversine model, in metres.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Geohash length used for route cache buckets.
///
/// A precision-7 cell spans roughly 153 m of longitude by 153 m of latitude
/// at the equator (longitude shrinks towards the poles). Origins inside one
/// cell share cached routes; origins 500 m apart never do.
pub const SPATIAL_BUCKET_PRECISION: usize = 7;

/// WGS-84 coordinate in decimal degrees.
///
/// ## Invariants
/// - Both components are finite.
/// - Latitude lies in `[-90, 90]` and longitude in `[-180, 180]`.
///
/// # Examples
/// ```
/// use transit_backend::domain::Coordinate;
///
/// let stop = Coordinate::new(-12.0464, -77.0428).expect("valid coordinate");
/// assert_eq!(stop.latitude(), -12.0464);
/// assert!(Coordinate::new(91.0, 0.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

/// Validation errors returned by [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CoordinateValidationError {
    /// One of the components is NaN or infinite.
    #[error("coordinates must be finite")]
    NonFinite,
    /// Latitude lies outside `[-90, 90]`.
    #[error("latitude must be within [-90, 90]")]
    LatitudeOutOfRange,
    /// Longitude lies outside `[-180, 180]`.
    #[error("longitude must be within [-180, 180]")]
    LongitudeOutOfRange,
}

impl Coordinate {
    /// Validate and build a coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateValidationError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateValidationError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateValidationError::LatitudeOutOfRange);
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateValidationError::LongitudeOutOfRange);
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// Latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Great-circle distance between two points on a spherical Earth, in metres.
///
/// The result is always finite and non-negative, and exactly zero for
/// identical points.
///
/// # Examples
/// ```
/// use transit_backend::domain::{Coordinate, haversine_meters};
///
/// let a = Coordinate::new(0.0, 0.0).expect("valid");
/// let b = Coordinate::new(0.0, 1.0).expect("valid");
/// let metres = haversine_meters(a, b);
/// assert!((metres - 111_194.9).abs() < 1.0);
/// ```
pub fn haversine_meters(from: Coordinate, to: Coordinate) -> f64 {
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();

    let sin_d_lat = (d_lat / 2.0).sin();
    let sin_d_lon = (d_lon / 2.0).sin();
    let a = sin_d_lat * sin_d_lat + lat1.cos() * lat2.cos() * sin_d_lon * sin_d_lon;
    // Rounding can push `a` fractionally past 1 for antipodal points.
    let central_angle = 2.0 * a.clamp(0.0, 1.0).sqrt().asin();
    EARTH_RADIUS_METERS * central_angle
}

/// Fixed-precision geohash of a route origin.
///
/// Buckets are deliberately coarse: nearby riders share a cache entry at the
/// cost of a slightly less exact route origin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpatialBucket(String);

/// Errors raised while encoding a [`SpatialBucket`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("spatial bucket encoding failed: {message}")]
pub struct SpatialBucketError {
    message: String,
}

impl SpatialBucket {
    /// Encode the bucket containing `origin`.
    ///
    /// # Examples
    /// ```
    /// use transit_backend::domain::{Coordinate, SpatialBucket};
    ///
    /// let origin = Coordinate::new(57.64911, 10.40744).expect("valid");
    /// let bucket = SpatialBucket::for_origin(origin).expect("bucket");
    /// assert_eq!(bucket.as_str(), "u4pruyd");
    /// ```
    pub fn for_origin(origin: Coordinate) -> Result<Self, SpatialBucketError> {
        let point = geohash::Coord {
            x: origin.longitude,
            y: origin.latitude,
        };
        geohash::encode(point, SPATIAL_BUCKET_PRECISION)
            .map(Self)
            .map_err(|error| SpatialBucketError {
                message: error.to_string(),
            })
    }

    /// Borrow the encoded bucket.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SpatialBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
