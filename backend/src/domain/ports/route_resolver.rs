//! Port for resolving routes through the cache layer.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{DestinationIdentity, RouteQuery, RouteResult};

define_port_error! {
    /// Failures that escape the route cache layer.
    pub enum RouteResolveError {
        /// The origin could not be bucketed for caching.
        Bucket {
            /// Failure detail.
            message: String,
        } => "route origin could not be bucketed: {message}",
        /// The underlying route computer broke its contract.
        Computation {
            /// Failure detail.
            message: String,
        } => "route computation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteResolver: Send + Sync {
    /// Resolve a route, serving cached results for the same origin bucket
    /// and destination identity.
    async fn resolve(
        &self,
        query: &RouteQuery,
        destination: DestinationIdentity,
    ) -> Result<RouteResult, RouteResolveError>;
}
