//! Route and ETA cache adapters.
//!
//! - [`memory`]: process-local maps with clock-driven expiry, for tests and
//!   single-instance deployments without Redis.
//! - [`redis`]: `bb8-redis` pooled adapters storing entries under the
//!   namespaced keys from `RouteCacheKey` and `EtaCacheKey`, with Redis-side
//!   expiry via `SET ... EX`.
//!
//! Both apply upsert semantics: concurrent writes to one key are
//! last-write-wins.

pub mod memory;
pub mod redis;

pub use memory::{InMemoryEtaCache, InMemoryRouteCache};
pub use redis::{RedisCachePool, RedisEtaCache, RedisRouteCache, connect_redis_pool};
