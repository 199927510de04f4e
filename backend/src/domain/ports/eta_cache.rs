//! Port interface for caching arrival estimates per stop.
use std::time::Duration;

use async_trait::async_trait;

use super::{EtaCacheKey, define_port_error};

define_port_error! {
    /// Errors surfaced by ETA cache adapters.
    pub enum EtaCacheError {
        /// Cache backend is unavailable or timing out.
        Backend {
            /// Failure detail.
            message: String,
        } => "eta cache backend failure: {message}",
        /// Stored value could not be decoded.
        Serialization {
            /// Failure detail.
            message: String,
        } => "eta cache serialisation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EtaCache: Send + Sync {
    /// Read the non-expired estimate (seconds) stored under `key`, if any.
    async fn get(&self, key: &EtaCacheKey) -> Result<Option<u32>, EtaCacheError>;

    /// Upsert `seconds` under `key`, expiring after `ttl`.
    async fn put(&self, key: &EtaCacheKey, seconds: u32, ttl: Duration)
    -> Result<(), EtaCacheError>;
}
