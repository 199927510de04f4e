//! Route and arrival-time resolution backend for transit tracking.
//!
//! The domain layer owns the cache-aside resolvers, the tiered ETA fallback,
//! and the ports they depend on. Outbound adapters implement those ports for
//! the upstream routing API, Redis or in-memory caches, and PostgreSQL stop
//! lookups.

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wiring;

pub use config::TransitSettings;
