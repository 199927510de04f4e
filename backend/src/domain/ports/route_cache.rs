//! Port interface for caching computed routes.
use std::time::Duration;

use async_trait::async_trait;

use super::{RouteCacheKey, define_port_error};
use crate::domain::RouteResult;

define_port_error! {
    /// Errors surfaced by route cache adapters.
    pub enum RouteCacheError {
        /// Cache backend is unavailable or timing out.
        Backend {
            /// Failure detail.
            message: String,
        } => "route cache backend failure: {message}",
        /// Serialisation or deserialisation of cached content failed.
        Serialization {
            /// Failure detail.
            message: String,
        } => "route cache serialisation failed: {message}",
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RouteCache: Send + Sync {
    /// Read the non-expired route stored under `key`, if any.
    async fn get(&self, key: &RouteCacheKey) -> Result<Option<RouteResult>, RouteCacheError>;

    /// Upsert `route` under `key`, expiring after `ttl`.
    async fn put(
        &self,
        key: &RouteCacheKey,
        route: &RouteResult,
        ttl: Duration,
    ) -> Result<(), RouteCacheError>;
}
