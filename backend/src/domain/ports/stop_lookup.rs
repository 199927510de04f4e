//! Driven port for reading stop coordinates.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{StopId, StopLocation};

define_port_error! {
    /// Errors raised while looking up stops.
    pub enum StopLookupError {
        /// Store connection could not be established.
        Connection {
            /// Failure detail.
            message: String,
        } => "stop lookup connection failed: {message}",
        /// Query failed during execution.
        Query {
            /// Failure detail.
            message: String,
        } => "stop lookup query failed: {message}",
    }
}

/// Port for fetching an active stop by identifier.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StopLookup: Send + Sync {
    /// Return the stop, or `None` when no active stop has this id.
    async fn find_stop(&self, stop_id: StopId) -> Result<Option<StopLocation>, StopLookupError>;
}

