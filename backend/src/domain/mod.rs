//! Domain primitives, services, and ports.
//!
//! Purpose: resolve travel routes to transit stops and vehicle arrival
//! estimates quickly under concurrent load, degrading gracefully when
//! upstream sources fail.
//!
//! Public surface:
//! - Value types: [`Coordinate`], [`StopId`], [`RouteQuery`], [`RouteResult`],
//!   [`EtaResult`], [`SpatialBucket`].
//! - Services: [`CachedRouteResolver`], [`FallbackRouteComputer`],
//!   [`RouteOrchestrator`], [`EtaResolver`], [`SimpleEtaStrategy`],
//!   [`TelemetryEtaStrategy`].
//! - [`Error`] and [`ErrorCode`] for transport-agnostic error envelopes.

mod cache_access;
pub mod error;
pub mod eta;
pub mod eta_resolver;
pub mod eta_strategies;
pub mod geo;
pub mod ports;
pub mod route_computer;
pub mod route_orchestrator;
pub mod route_resolver;
pub mod routing;

pub use self::error::{Error, ErrorCode, ErrorValidationError};
pub use self::eta::{EtaEstimate, EtaResult, EtaSource};
pub use self::eta_resolver::{EtaError, EtaResolver, EtaResolverConfig};
pub use self::eta_strategies::{
    EtaSchedule, EtaScheduleError, SimpleEtaStrategy, TelemetryEtaStrategy,
};
pub use self::geo::{
    Coordinate, CoordinateValidationError, EARTH_RADIUS_METERS, SPATIAL_BUCKET_PRECISION,
    SpatialBucket, SpatialBucketError, haversine_meters,
};
pub use self::route_computer::FallbackRouteComputer;
pub use self::route_orchestrator::{RouteOrchestrator, RouteToStopError, RouteToStopRequest};
pub use self::route_resolver::{CachedRouteResolver, RouteResolverConfig};
pub use self::routing::{
    DestinationIdentity, RouteQuery, RouteResult, StopId, StopIdValidationError, StopLocation,
    URBAN_FALLBACK_SPEED_MPS,
};
