//! Route computation with graceful degradation.
//!
//! [`FallbackRouteComputer`] asks the upstream routing source first and
//! replaces any failure with the straight-line estimate, so callers always
//! receive a route.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::domain::ports::{RouteComputer, RouteComputerError, RoutingSource};
use crate::domain::{RouteQuery, RouteResult};

/// Route computer absorbing upstream failures into degraded estimates.
#[derive(Clone)]
pub struct FallbackRouteComputer<S: ?Sized> {
    source: Arc<S>,
}

impl<S: ?Sized> FallbackRouteComputer<S> {
    /// Wrap an upstream routing source.
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S> RouteComputer for FallbackRouteComputer<S>
where
    S: RoutingSource + ?Sized,
{
    async fn compute(&self, query: &RouteQuery) -> Result<RouteResult, RouteComputerError> {
        match self.source.fetch_route(query).await {
            Ok(route) => Ok(route),
            Err(error) => {
                warn!(
                    error = %error,
                    origin_lat = query.origin.latitude(),
                    origin_lon = query.origin.longitude(),
                    "routing source failed; using straight-line estimate"
                );
                Ok(RouteResult::straight_line(query))
            }
        }
    }
}
