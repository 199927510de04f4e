//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Ports describe how the domain expects to interact with driven adapters
//! (routing APIs, caches, stop stores, metrics exporters). Each trait exposes
//! strongly typed errors so adapters map their failures into predictable
//! variants.

mod macros;
pub(crate) use macros::define_port_error;

mod cache_key;
mod cache_metrics;
mod eta_cache;
mod eta_strategy;
mod route_cache;
mod route_computer;
mod route_resolver;
mod routing_source;
mod stop_lookup;
mod vehicle_position_source;

pub use cache_key::{EtaCacheKey, RouteCacheKey};
#[cfg(test)]
pub use cache_metrics::MockCacheMetrics;
pub use cache_metrics::{CacheMetrics, CacheMetricsError, CacheTier, NoOpCacheMetrics};
#[cfg(test)]
pub use eta_cache::MockEtaCache;
pub use eta_cache::{EtaCache, EtaCacheError};
#[cfg(test)]
pub use eta_strategy::MockEtaStrategy;
pub use eta_strategy::{EtaStrategy, EtaStrategyError};
#[cfg(test)]
pub use route_cache::MockRouteCache;
pub use route_cache::{RouteCache, RouteCacheError};
#[cfg(test)]
pub use route_computer::MockRouteComputer;
pub use route_computer::{RouteComputer, RouteComputerError};
#[cfg(test)]
pub use route_resolver::MockRouteResolver;
pub use route_resolver::{RouteResolveError, RouteResolver};
#[cfg(test)]
pub use routing_source::MockRoutingSource;
pub use routing_source::{FixtureRoutingSource, RoutingSource, RoutingSourceError};
#[cfg(test)]
pub use stop_lookup::MockStopLookup;
pub use stop_lookup::{StopLookup, StopLookupError};
#[cfg(test)]
pub use vehicle_position_source::MockVehiclePositionSource;
pub use vehicle_position_source::{
    FixtureVehiclePositionSource, VehiclePosition, VehiclePositionSource,
    VehiclePositionSourceError,
};
