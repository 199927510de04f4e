//! Port for computing routes between coordinates.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{RouteQuery, RouteResult};

define_port_error! {
    /// Unexpected failures of a route computer.
    ///
    /// Computers absorb upstream outages themselves; this error signals a
    /// broken contract and is propagated to callers.
    pub enum RouteComputerError {
        /// Computation failed for reasons other than an upstream outage.
        Internal {
            /// Failure detail.
            message: String,
        } => "route computation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteComputer: Send + Sync {
    /// Compute a route, degrading instead of failing when upstream is down.
    async fn compute(&self, query: &RouteQuery) -> Result<RouteResult, RouteComputerError>;
}
