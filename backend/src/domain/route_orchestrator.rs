//! Route-to-stop orchestration.
//!
//! Looks up the stop's coordinates, then resolves a route through the cache
//! layer keyed on the stop itself, so riders in the same origin bucket share
//! routes to the same stop.

use std::sync::Arc;

use serde_json::json;
use thiserror::Error;
use tracing::debug;

use crate::domain::ports::{RouteResolveError, RouteResolver, StopLookup, StopLookupError};
use crate::domain::{
    Coordinate, CoordinateValidationError, DestinationIdentity, Error, RouteQuery, RouteResult,
    StopId, StopIdValidationError,
};

/// Inputs for [`RouteOrchestrator::route_to_stop`], as received from callers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteToStopRequest {
    /// Rider latitude in decimal degrees.
    pub origin_latitude: f64,
    /// Rider longitude in decimal degrees.
    pub origin_longitude: f64,
    /// Raw stop identifier; validated before any lookup.
    pub stop_id: i32,
}

/// Failures of [`RouteOrchestrator::route_to_stop`].
#[derive(Debug, Error)]
pub enum RouteToStopError {
    /// Stop identifier was not positive.
    #[error("invalid stop id {stop_id}")]
    InvalidStopId {
        /// Identifier as supplied.
        stop_id: i32,
        /// Underlying failure.
        #[source]
        source: StopIdValidationError,
    },
    /// Origin coordinates were out of range or not finite.
    #[error("invalid origin for route to stop {stop_id}")]
    InvalidOrigin {
        /// Stop being resolved.
        stop_id: StopId,
        /// Underlying failure.
        #[source]
        source: CoordinateValidationError,
    },
    /// No active stop has this identifier.
    #[error("stop {stop_id} not found")]
    StopNotFound {
        /// Identifier with no active stop.
        stop_id: StopId,
    },
    /// The stop lookup itself failed.
    #[error("failed to look up stop {stop_id}")]
    StopLookup {
        /// Stop being resolved.
        stop_id: StopId,
        /// Underlying failure.
        #[source]
        source: StopLookupError,
    },
    /// Route resolution failed after the stop was found.
    #[error("failed to resolve route to stop {stop_id}")]
    Routing {
        /// Stop being resolved.
        stop_id: StopId,
        /// Underlying failure.
        #[source]
        source: RouteResolveError,
    },
}

impl From<RouteToStopError> for Error {
    fn from(err: RouteToStopError) -> Self {
        let message = err.to_string();
        match err {
            RouteToStopError::InvalidStopId { stop_id, source } => Error::invalid_request(message)
                .with_details(json!({ "stopId": stop_id, "reason": source.to_string() })),
            RouteToStopError::InvalidOrigin { stop_id, source } => Error::invalid_request(message)
                .with_details(json!({ "stopId": stop_id.get(), "reason": source.to_string() })),
            RouteToStopError::StopNotFound { stop_id } => {
                Error::not_found(message).with_details(json!({ "stopId": stop_id.get() }))
            }
            RouteToStopError::StopLookup {
                source: StopLookupError::Connection { message: cause },
                ..
            } => Error::service_unavailable(format!("{message}: {cause}")),
            RouteToStopError::StopLookup { source, .. } => {
                Error::internal(format!("{message}: {source}"))
            }
            RouteToStopError::Routing { source, .. } => {
                Error::internal(format!("{message}: {source}"))
            }
        }
    }
}

/// Service resolving routes from a rider position to a transit stop.
#[derive(Clone)]
pub struct RouteOrchestrator<L: ?Sized, R: ?Sized> {
    stops: Arc<L>,
    resolver: Arc<R>,
}

impl<L: ?Sized, R: ?Sized> RouteOrchestrator<L, R> {
    /// Create an orchestrator over a stop lookup and a route resolver.
    pub fn new(stops: Arc<L>, resolver: Arc<R>) -> Self {
        Self { stops, resolver }
    }
}

impl<L, R> RouteOrchestrator<L, R>
where
    L: StopLookup + ?Sized,
    R: RouteResolver + ?Sized,
{
    /// Resolve a route from the rider's position to the stop.
    ///
    /// The stop identifier is validated first; an invalid id never reaches
    /// the lookup. Upstream routing outages surface as a degraded result,
    /// not an error.
    pub async fn route_to_stop(
        &self,
        request: RouteToStopRequest,
    ) -> Result<RouteResult, RouteToStopError> {
        let stop_id = StopId::new(request.stop_id).map_err(|source| {
            RouteToStopError::InvalidStopId {
                stop_id: request.stop_id,
                source,
            }
        })?;
        let origin = Coordinate::new(request.origin_latitude, request.origin_longitude)
            .map_err(|source| RouteToStopError::InvalidOrigin { stop_id, source })?;

        let stop = self
            .stops
            .find_stop(stop_id)
            .await
            .map_err(|source| RouteToStopError::StopLookup { stop_id, source })?
            .ok_or(RouteToStopError::StopNotFound { stop_id })?;

        let query = RouteQuery::new(origin, stop.coordinate);
        let route = self
            .resolver
            .resolve(&query, DestinationIdentity::Stop(stop_id))
            .await
            .map_err(|source| RouteToStopError::Routing { stop_id, source })?;

        debug!(
            stop_id = stop_id.get(),
            degraded = route.degraded,
            duration_seconds = route.duration_seconds,
            "resolved route to stop"
        );
        Ok(route)
    }
}

#[cfg(test)]
#[path = "route_orchestrator_tests.rs"]
mod tests;
