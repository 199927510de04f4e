//! Port for interchangeable arrival-time strategies.

use async_trait::async_trait;

use super::define_port_error;
use crate::domain::{EtaEstimate, StopId};

define_port_error! {
    /// Errors returned by ETA strategies.
    pub enum EtaStrategyError {
        /// Live telemetry has no recent data for the stop.
        ///
        /// The resolver treats this as the signal to try its fallback.
        NoDataAvailable {
            /// Failure detail.
            message: String,
        } => "no recent data available: {message}",
        /// Hard failure; never triggers the fallback.
        Failed {
            /// Failure detail.
            message: String,
        } => "eta strategy failed: {message}",
    }
}

impl EtaStrategyError {
    /// Whether this is the recoverable "no data" signal.
    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoDataAvailable { .. })
    }
}

/// Strategy computing the arrival estimate for one stop.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EtaStrategy: Send + Sync {
    /// Estimate seconds until the next arrival at `stop_id`.
    async fn estimate(&self, stop_id: StopId) -> Result<EtaEstimate, EtaStrategyError>;
}
