//! Cache key types shared by route and ETA cache adapters.

use std::fmt;

use crate::domain::{DestinationIdentity, SpatialBucket, StopId};

/// Version segment embedded in storage keys for schema-safe invalidation.
const KEY_VERSION: &str = "v1";

/// Route cache key: origin bucket plus destination identity.
///
/// # Examples
/// ```
/// use transit_backend::domain::ports::RouteCacheKey;
/// use transit_backend::domain::{Coordinate, DestinationIdentity, SpatialBucket, StopId};
///
/// let origin = Coordinate::new(57.64911, 10.40744).expect("valid");
/// let bucket = SpatialBucket::for_origin(origin).expect("bucket");
/// let stop = StopId::new(12).expect("valid id");
/// let key = RouteCacheKey::new(bucket, DestinationIdentity::Stop(stop));
/// assert_eq!(key.storage_key(), "route:v1:u4pruyd:12");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RouteCacheKey {
    bucket: SpatialBucket,
    destination: DestinationIdentity,
}

impl RouteCacheKey {
    /// Compose a key from its two components.
    pub fn new(bucket: SpatialBucket, destination: DestinationIdentity) -> Self {
        Self {
            bucket,
            destination,
        }
    }

    /// Origin bucket component.
    pub fn bucket(&self) -> &SpatialBucket {
        &self.bucket
    }

    /// Destination component.
    pub fn destination(&self) -> DestinationIdentity {
        self.destination
    }

    /// Namespaced string form used by external stores.
    pub fn storage_key(&self) -> String {
        format!(
            "route:{KEY_VERSION}:{}:{}",
            self.bucket,
            self.destination.key_component()
        )
    }
}

impl fmt::Display for RouteCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}

/// ETA cache key: one entry per stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EtaCacheKey(StopId);

impl EtaCacheKey {
    /// Key for the given stop.
    pub fn new(stop_id: StopId) -> Self {
        Self(stop_id)
    }

    /// Stop the entry belongs to.
    pub fn stop_id(&self) -> StopId {
        self.0
    }

    /// Namespaced string form used by external stores.
    pub fn storage_key(&self) -> String {
        format!("eta:{KEY_VERSION}:{}", self.0)
    }
}

impl fmt::Display for EtaCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_key())
    }
}
