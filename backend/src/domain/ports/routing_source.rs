//! Driven port for the upstream routing API.
//!
//! Adapters own transport concerns only. Degradation to a straight-line
//! estimate happens in the domain, see `FallbackRouteComputer`.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{RouteQuery, RouteResult};

define_port_error! {
    /// Errors surfaced while calling the upstream routing API.
    pub enum RoutingSourceError {
        /// Network transport failed before a response arrived.
        Transport {
            /// Failure detail.
            message: String,
        } => "routing transport failed: {message}",
        /// The call exceeded its deadline.
        Timeout {
            /// Failure detail.
            message: String,
        } => "routing call timed out: {message}",
        /// Upstream answered with a non-success status.
        Status {
            /// Failure detail.
            message: String,
        } => "routing upstream rejected request: {message}",
        /// Upstream payload could not be decoded.
        Decode {
            /// Failure detail.
            message: String,
        } => "routing response decode failed: {message}",
        /// Upstream returned an empty candidate list.
        NoRoutes => "routing upstream returned no routes",
    }
}

/// Port for fetching the primary route between two coordinates.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoutingSource: Send + Sync {
    /// Fetch the first candidate route; results are never degraded.
    async fn fetch_route(&self, query: &RouteQuery) -> Result<RouteResult, RoutingSourceError>;
}

/// Fixture source that always reports an outage, forcing degraded routes.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureRoutingSource;

#[async_trait]
impl RoutingSource for FixtureRoutingSource {
    async fn fetch_route(&self, _query: &RouteQuery) -> Result<RouteResult, RoutingSourceError> {
        Err(RoutingSourceError::transport("fixture routing source is offline"))
    }
}
