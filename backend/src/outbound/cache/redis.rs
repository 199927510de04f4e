//! Redis cache adapters backed by a `bb8-redis` connection pool.
//!
//! Routes are stored as JSON; ETAs as their integer second count. Every
//! write is a single `SET key value EX ttl`, so Redis owns expiry and
//! concurrent writers resolve last-write-wins.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection, RunError};
use bb8_redis::redis::{AsyncCommands, RedisError};

use crate::domain::RouteResult;
use crate::domain::ports::{
    EtaCache, EtaCacheError, EtaCacheKey, RouteCache, RouteCacheError, RouteCacheKey,
};

/// Shared Redis connection pool.
pub type RedisCachePool = Pool<RedisConnectionManager>;

/// Build a pool for `redis_url` with at most `max_size` connections.
///
/// # Errors
///
/// Returns an error when the URL is invalid or the first connection fails.
pub async fn connect_redis_pool(
    redis_url: &str,
    max_size: u32,
    connection_timeout: Duration,
) -> Result<RedisCachePool, RedisError> {
    let manager = RedisConnectionManager::new(redis_url)?;
    Pool::builder()
        .max_size(max_size.max(1))
        .connection_timeout(connection_timeout)
        .build(manager)
        .await
}

/// Whole seconds for `SET ... EX`, which rejects zero.
fn expiry_seconds(ttl: Duration) -> u64 {
    let rounded_up = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    rounded_up.max(1)
}

async fn checkout(
    pool: &RedisCachePool,
) -> Result<PooledConnection<'_, RedisConnectionManager>, String> {
    pool.get().await.map_err(|error| match error {
        RunError::User(error) => format!("redis connection failed: {error}"),
        RunError::TimedOut => "timed out waiting for a redis connection".to_owned(),
    })
}

/// Route cache storing JSON-encoded [`RouteResult`] values.
#[derive(Clone)]
pub struct RedisRouteCache {
    pool: RedisCachePool,
}

impl RedisRouteCache {
    /// Wrap an existing pool.
    pub fn new(pool: RedisCachePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouteCache for RedisRouteCache {
    async fn get(&self, key: &RouteCacheKey) -> Result<Option<RouteResult>, RouteCacheError> {
        let mut conn = checkout(&self.pool)
            .await
            .map_err(RouteCacheError::backend)?;
        let payload: Option<String> = conn
            .get(key.storage_key())
            .await
            .map_err(|error| RouteCacheError::backend(error.to_string()))?;
        payload
            .map(|json| decode_route(&json))
            .transpose()
    }

    async fn put(
        &self,
        key: &RouteCacheKey,
        route: &RouteResult,
        ttl: Duration,
    ) -> Result<(), RouteCacheError> {
        let payload = serde_json::to_string(route)
            .map_err(|error| RouteCacheError::serialization(error.to_string()))?;
        let mut conn = checkout(&self.pool)
            .await
            .map_err(RouteCacheError::backend)?;
        conn.set_ex::<_, _, ()>(key.storage_key(), payload, expiry_seconds(ttl))
            .await
            .map_err(|error| RouteCacheError::backend(error.to_string()))
    }
}

fn decode_route(json: &str) -> Result<RouteResult, RouteCacheError> {
    serde_json::from_str(json).map_err(|error| RouteCacheError::serialization(error.to_string()))
}

/// ETA cache storing integer second counts.
#[derive(Clone)]
pub struct RedisEtaCache {
    pool: RedisCachePool,
}

impl RedisEtaCache {
    /// Wrap an existing pool.
    pub fn new(pool: RedisCachePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EtaCache for RedisEtaCache {
    async fn get(&self, key: &EtaCacheKey) -> Result<Option<u32>, EtaCacheError> {
        let mut conn = checkout(&self.pool).await.map_err(EtaCacheError::backend)?;
        let raw: Option<String> = conn
            .get(key.storage_key())
            .await
            .map_err(|error| EtaCacheError::backend(error.to_string()))?;
        raw.map(|value| {
            value.parse::<u32>().map_err(|error| {
                EtaCacheError::serialization(format!("invalid cached eta {value:?}: {error}"))
            })
        })
        .transpose()
    }

    async fn put(&self, key: &EtaCacheKey, seconds: u32, ttl: Duration) -> Result<(), EtaCacheError> {
        let mut conn = checkout(&self.pool).await.map_err(EtaCacheError::backend)?;
        conn.set_ex::<_, _, ()>(key.storage_key(), seconds, expiry_seconds(ttl))
            .await
            .map_err(|error| EtaCacheError::backend(error.to_string()))
    }
}
