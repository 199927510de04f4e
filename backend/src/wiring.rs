//! Service graph assembly.
//!
//! [`TransitPorts`] bundles the driven adapters; [`TransitServices::assemble`]
//! builds the resolvers over them. [`TransitServices::from_settings`]
//! connects the production adapters first.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{SettingsError, TransitSettings};
use crate::domain::ports::{
    CacheMetrics, EtaCache, EtaStrategy, NoOpCacheMetrics, RouteCache, RouteResolver,
    RoutingSource, StopLookup, VehiclePositionSource,
};
use crate::domain::{
    CachedRouteResolver, EtaResolver, FallbackRouteComputer, RouteOrchestrator,
    SimpleEtaStrategy, TelemetryEtaStrategy,
};
use crate::outbound::cache::{
    InMemoryEtaCache, InMemoryRouteCache, RedisEtaCache, RedisRouteCache, connect_redis_pool,
};
use crate::outbound::persistence::{
    DbPool, DieselStopLookup, DieselVehiclePositionSource, PoolConfig, PoolError,
};
use crate::outbound::routes_api::GoogleRoutesHttpSource;

const REDIS_POOL_SIZE: u32 = 16;

/// Route orchestrator over type-erased ports.
pub type DynRouteOrchestrator = RouteOrchestrator<dyn StopLookup, dyn RouteResolver>;
/// ETA resolver over type-erased ports.
pub type DynEtaResolver = EtaResolver<dyn EtaStrategy, dyn EtaCache>;

/// Errors raised while connecting adapters.
#[derive(Debug, Error)]
pub enum WiringError {
    /// Settings were missing or invalid.
    #[error(transparent)]
    Settings(#[from] SettingsError),
    /// The HTTP client for the routing API could not be built.
    #[error("failed to build routing client: {0}")]
    RoutingClient(#[from] reqwest::Error),
    /// The Redis pool could not be created.
    #[error("failed to connect to redis: {0}")]
    Redis(#[from] bb8_redis::redis::RedisError),
    /// The PostgreSQL pool could not be created.
    #[error(transparent)]
    Database(#[from] PoolError),
}

/// Driven adapters the services are built over.
pub struct TransitPorts {
    /// Upstream routing API.
    pub routing: Arc<dyn RoutingSource>,
    /// Route cache backend.
    pub route_cache: Arc<dyn RouteCache>,
    /// ETA cache backend.
    pub eta_cache: Arc<dyn EtaCache>,
    /// Stop coordinates.
    pub stops: Arc<dyn StopLookup>,
    /// Live vehicle positions for the telemetry strategy.
    pub vehicle_positions: Arc<dyn VehiclePositionSource>,
    /// Cache hit/miss reporting.
    pub metrics: Arc<dyn CacheMetrics>,
    /// Wall clock for peak hours, telemetry freshness, and in-memory expiry.
    pub clock: Arc<dyn Clock>,
}

/// The resolvers exposed to inbound adapters.
#[derive(Clone)]
pub struct TransitServices {
    /// Route-to-stop orchestration.
    pub routes: Arc<DynRouteOrchestrator>,
    /// Tiered ETA resolution.
    pub etas: Arc<DynEtaResolver>,
}

impl TransitServices {
    /// Build the service graph over `ports` using tuning from `settings`.
    pub fn assemble(ports: TransitPorts, settings: &TransitSettings) -> Result<Self, SettingsError> {
        let computer = Arc::new(FallbackRouteComputer::new(ports.routing));
        let resolver: Arc<dyn RouteResolver> = Arc::new(
            CachedRouteResolver::new(computer, ports.route_cache, settings.route_resolver_config())
                .with_metrics(Arc::clone(&ports.metrics)),
        );
        let routes = Arc::new(RouteOrchestrator::new(Arc::clone(&ports.stops), resolver));

        let schedule: Arc<dyn EtaStrategy> = Arc::new(SimpleEtaStrategy::new(
            settings.eta_schedule()?,
            Arc::clone(&ports.clock),
        ));
        let resolver = if settings.eta_telemetry_enabled {
            let telemetry: Arc<dyn EtaStrategy> = Arc::new(
                TelemetryEtaStrategy::new(ports.vehicle_positions, ports.stops, ports.clock)
                    .with_freshness(settings.telemetry_freshness()),
            );
            EtaResolver::new(telemetry, ports.eta_cache).with_fallback(schedule)
        } else {
            EtaResolver::new(schedule, ports.eta_cache)
        };
        let etas = Arc::new(
            resolver
                .with_config(settings.eta_resolver_config())
                .with_metrics(ports.metrics),
        );

        Ok(Self { routes, etas })
    }

    /// Connect the production adapters described by `settings`.
    ///
    /// Caches use Redis when `redis_url` is set and stay in-process otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error when settings are invalid or a backend is unreachable.
    pub async fn from_settings(settings: &TransitSettings) -> Result<Self, WiringError> {
        let api_key = settings.routes_api_key();
        if api_key.is_empty() {
            warn!("no routes API key configured; every route will be a straight-line estimate");
        }
        let routing = Arc::new(GoogleRoutesHttpSource::new(
            settings.routes_api_url()?,
            api_key,
            settings.routes_timeout(),
        )?);

        let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
        let (route_cache, eta_cache): (Arc<dyn RouteCache>, Arc<dyn EtaCache>) =
            match settings.redis_url.as_deref() {
                Some(url) => {
                    let timeout = settings.route_resolver_config().cache_read_timeout;
                    let pool = connect_redis_pool(url, REDIS_POOL_SIZE, timeout).await?;
                    info!("using redis caches");
                    (
                        Arc::new(RedisRouteCache::new(pool.clone())),
                        Arc::new(RedisEtaCache::new(pool)),
                    )
                }
                None => {
                    info!("using in-process caches");
                    (
                        Arc::new(InMemoryRouteCache::new(Arc::clone(&clock))),
                        Arc::new(InMemoryEtaCache::new(Arc::clone(&clock))),
                    )
                }
            };

        let db = DbPool::new(
            PoolConfig::new(settings.database_url()?)
                .with_connection_timeout(settings.db_timeout()),
        )
        .await?;
        let stops = Arc::new(DieselStopLookup::new(db.clone(), settings.db_timeout()));
        let vehicle_positions = Arc::new(DieselVehiclePositionSource::new(db, settings.db_timeout()));

        let ports = TransitPorts {
            routing,
            route_cache,
            eta_cache,
            stops,
            vehicle_positions,
            metrics: Arc::new(NoOpCacheMetrics),
            clock,
        };
        Self::assemble(ports, settings).map_err(WiringError::from)
    }
}
