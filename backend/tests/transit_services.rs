//! End-to-end behaviour of the assembled route and ETA services over
//! in-process adapters.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use mockable::Clock;
use rstest::{fixture, rstest};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;
use zeroize::Zeroizing;

use transit_backend::TransitSettings;
use transit_backend::domain::ports::{
    CacheTier, FixtureRoutingSource, FixtureVehiclePositionSource, RouteCache, RouteCacheKey,
    RoutingSource, RoutingSourceError, StopLookup,
};
use transit_backend::domain::{
    Coordinate, DestinationIdentity, ErrorCode, RouteQuery, RouteResult, RouteToStopRequest,
    SpatialBucket, StopId, StopLocation,
};
use transit_backend::outbound::cache::{InMemoryEtaCache, InMemoryRouteCache};
use transit_backend::outbound::routes_api::GoogleRoutesHttpSource;
use transit_backend::test_support::{
    CacheEvent, InMemoryStopLookup, MutableClock, RecordingCacheMetrics, at_local_hour,
};
use transit_backend::wiring::{TransitPorts, TransitServices};

const ORIGIN: (f64, f64) = (-12.0464, -77.0428);

/// Routing source returning one fixed route and counting calls.
struct CountingRoutingSource {
    route: RouteResult,
    calls: AtomicUsize,
}

impl CountingRoutingSource {
    fn new(route: RouteResult) -> Self {
        Self {
            route,
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RoutingSource for CountingRoutingSource {
    async fn fetch_route(&self, _query: &RouteQuery) -> Result<RouteResult, RoutingSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.route.clone())
    }
}

struct Harness {
    services: TransitServices,
    clock: Arc<MutableClock>,
    stops: Arc<InMemoryStopLookup>,
    route_cache: Arc<InMemoryRouteCache>,
    metrics: Arc<RecordingCacheMetrics>,
}

fn settings() -> TransitSettings {
    TransitSettings {
        routes_api_url: None,
        routes_api_key: None,
        routes_timeout_secs: None,
        route_cache_ttl_secs: None,
        eta_cache_ttl_secs: None,
        cache_timeout_secs: None,
        max_pending_cache_writes: None,
        eta_off_peak_base_secs: None,
        eta_peak_base_secs: None,
        eta_peak_hours: None,
        eta_telemetry_enabled: false,
        telemetry_freshness_secs: None,
        redis_url: None,
        database_url: None,
        db_timeout_secs: None,
    }
}

fn stop(id: i32, latitude: f64, longitude: f64) -> StopLocation {
    StopLocation {
        id: StopId::new(id).expect("valid stop id"),
        name: format!("Stop {id}"),
        coordinate: Coordinate::new(latitude, longitude).expect("valid coordinate"),
    }
}

fn harness_with(routing: Arc<dyn RoutingSource>, settings: &TransitSettings) -> Harness {
    let clock = Arc::new(MutableClock::new(at_local_hour(12)));
    let shared_clock: Arc<dyn Clock> = clock.clone();
    let stops = Arc::new(InMemoryStopLookup::new([
        stop(12, -12.0500, -77.0300),
        stop(60, -12.0600, -77.0350),
    ]));
    let route_cache = Arc::new(InMemoryRouteCache::new(Arc::clone(&shared_clock)));
    let metrics = Arc::new(RecordingCacheMetrics::default());

    let ports = TransitPorts {
        routing,
        route_cache: route_cache.clone(),
        eta_cache: Arc::new(InMemoryEtaCache::new(Arc::clone(&shared_clock))),
        stops: stops.clone() as Arc<dyn StopLookup>,
        vehicle_positions: Arc::new(FixtureVehiclePositionSource),
        metrics: metrics.clone(),
        clock: shared_clock,
    };
    let services = TransitServices::assemble(ports, settings).expect("services assemble");
    Harness {
        services,
        clock,
        stops,
        route_cache,
        metrics,
    }
}

#[fixture]
fn harness() -> Harness {
    harness_with(Arc::new(FixtureRoutingSource), &settings())
}

fn request(stop_id: i32) -> RouteToStopRequest {
    RouteToStopRequest {
        origin_latitude: ORIGIN.0,
        origin_longitude: ORIGIN.1,
        stop_id,
    }
}

fn route_key(stop_id: i32) -> RouteCacheKey {
    let origin = Coordinate::new(ORIGIN.0, ORIGIN.1).expect("valid origin");
    RouteCacheKey::new(
        SpatialBucket::for_origin(origin).expect("bucket"),
        DestinationIdentity::Stop(StopId::new(stop_id).expect("valid stop id")),
    )
}

async fn wait_for_route(cache: &InMemoryRouteCache, key: &RouteCacheKey) -> RouteResult {
    for _ in 0..100 {
        if let Some(route) = cache.get(key).await.expect("in-memory read") {
            return route;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("route {key} was never written back");
}

#[rstest]
#[tokio::test]
async fn eta_is_served_from_cache_on_second_request(harness: Harness) {
    let first = harness.services.etas.estimate(60).await.expect("eta");
    assert_eq!(first.seconds, 180);
    assert_eq!(first.source.as_str(), "simple");

    let second = harness.services.etas.estimate(60).await.expect("eta");
    assert_eq!(second.seconds, 180);
    assert_eq!(second.source.as_str(), "cache");
    assert_eq!(harness.metrics.count(CacheEvent::Miss, CacheTier::Eta), 1);
    assert_eq!(harness.metrics.count(CacheEvent::Hit, CacheTier::Eta), 1);
}

#[rstest]
#[tokio::test]
async fn eta_offset_wraps_every_sixty_stops(harness: Harness) {
    let first = harness.services.etas.estimate(1).await.expect("eta");
    let wrapped = harness.services.etas.estimate(61).await.expect("eta");
    assert_eq!(first.seconds, 181);
    assert_eq!(wrapped.seconds, first.seconds);
}

#[rstest]
#[tokio::test]
async fn eta_is_recomputed_after_the_cache_entry_expires(harness: Harness) {
    harness.services.etas.estimate(7).await.expect("eta");
    harness.clock.advance(Duration::from_secs(61));

    let refreshed = harness.services.etas.estimate(7).await.expect("eta");
    assert_eq!(refreshed.source.as_str(), "simple");
    assert_eq!(harness.metrics.count(CacheEvent::Miss, CacheTier::Eta), 2);
}

#[rstest]
#[tokio::test]
async fn peak_hours_raise_the_base_wait(harness: Harness) {
    harness.clock.advance(Duration::from_secs(5 * 3600));
    let eta = harness.services.etas.estimate(60).await.expect("eta");
    assert_eq!(eta.seconds, 360);
}

#[rstest]
#[tokio::test]
async fn invalid_eta_stop_is_rejected(harness: Harness) {
    let error = harness.services.etas.estimate(0).await.expect_err("invalid id");
    let api_error = transit_backend::domain::Error::from(error);
    assert_eq!(api_error.code(), ErrorCode::InvalidRequest);
}

#[tokio::test]
async fn telemetry_without_positions_falls_back_to_the_schedule() {
    let mut settings = settings();
    settings.eta_telemetry_enabled = true;
    let harness = harness_with(Arc::new(FixtureRoutingSource), &settings);

    let eta = harness.services.etas.estimate(60).await.expect("eta");
    assert_eq!(eta.seconds, 180);
    assert_eq!(eta.source.as_str(), "simple_fallback");
}

#[rstest]
#[tokio::test]
async fn routing_outage_degrades_to_a_straight_line(harness: Harness) {
    let route = harness
        .services
        .routes
        .route_to_stop(request(12))
        .await
        .expect("degraded route");
    assert!(route.degraded);
    assert!(route.encoded_path.is_empty());
    assert!(route.distance_meters > 0);
    assert!(route.duration_seconds > 0);

    let cached = wait_for_route(&harness.route_cache, &route_key(12)).await;
    assert!(cached.degraded);
}

#[tokio::test]
async fn second_route_request_is_a_cache_hit() {
    let upstream = Arc::new(CountingRoutingSource::new(RouteResult {
        encoded_path: "_p~iF~ps|U".to_owned(),
        distance_meters: 1_450,
        duration_seconds: 300,
        degraded: false,
    }));
    let harness = harness_with(upstream.clone(), &settings());

    let first = harness
        .services
        .routes
        .route_to_stop(request(12))
        .await
        .expect("route");
    wait_for_route(&harness.route_cache, &route_key(12)).await;
    let second = harness
        .services
        .routes
        .route_to_stop(request(12))
        .await
        .expect("route");

    assert_eq!(first, second);
    assert_eq!(upstream.calls(), 1);
    assert_eq!(harness.metrics.count(CacheEvent::Hit, CacheTier::Route), 1);
}

#[rstest]
#[tokio::test]
async fn unknown_stop_maps_to_not_found(harness: Harness) {
    let error = harness
        .services
        .routes
        .route_to_stop(request(999))
        .await
        .expect_err("missing stop");
    let api_error = transit_backend::domain::Error::from(error);
    assert_eq!(api_error.code(), ErrorCode::NotFound);
    let details = api_error.details().expect("details");
    assert_eq!(details["stopId"], 999);
}

#[rstest]
#[case(0)]
#[case(-4)]
#[tokio::test]
async fn invalid_route_stop_skips_the_lookup(harness: Harness, #[case] stop_id: i32) {
    let error = harness
        .services
        .routes
        .route_to_stop(request(stop_id))
        .await
        .expect_err("invalid id");
    let api_error = transit_backend::domain::Error::from(error);
    assert_eq!(api_error.code(), ErrorCode::InvalidRequest);
    assert_eq!(harness.stops.calls(), 0);
}

/// Serve one HTTP response to the first connection and hand back the request.
async fn serve_once(status: &'static str, body: &'static str) -> (Url, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");
    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let request = read_request(&mut socket).await;
        let response = format!(
            "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.expect("write");
        socket.shutdown().await.expect("shutdown");
        request
    });
    let url = Url::parse(&format!("http://{address}/directions/v2:computeRoutes")).expect("url");
    (url, handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let read = socket.read(&mut chunk).await.expect("read");
        if read == 0 {
            break;
        }
        buffer.extend_from_slice(&chunk[..read]);
        let text = String::from_utf8_lossy(&buffer);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buffer.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

fn http_source(url: Url) -> Arc<GoogleRoutesHttpSource> {
    Arc::new(
        GoogleRoutesHttpSource::new(
            url,
            Zeroizing::new("test-key".to_owned()),
            Duration::from_secs(5),
        )
        .expect("client"),
    )
}

#[tokio::test]
async fn empty_upstream_route_list_degrades() {
    let (url, server) = serve_once("200 OK", r#"{"routes":[]}"#).await;
    let harness = harness_with(http_source(url), &settings());

    let route = harness
        .services
        .routes
        .route_to_stop(request(12))
        .await
        .expect("degraded route");
    assert!(route.degraded);
    server.await.expect("server task");
}

#[tokio::test]
async fn upstream_route_is_decoded_and_request_is_authenticated() {
    let (url, server) = serve_once(
        "200 OK",
        r#"{"routes":[{"distanceMeters":1450,"duration":"300s","polyline":{"encodedPolyline":"_p~iF~ps|U"}}]}"#,
    )
    .await;
    let harness = harness_with(http_source(url), &settings());

    let route = harness
        .services
        .routes
        .route_to_stop(request(12))
        .await
        .expect("route");
    assert!(!route.degraded);
    assert_eq!(route.distance_meters, 1_450);
    assert_eq!(route.duration_seconds, 300);
    assert_eq!(route.encoded_path, "_p~iF~ps|U");

    let raw_request = server.await.expect("server task").to_ascii_lowercase();
    assert!(raw_request.contains("x-goog-api-key: test-key"));
    assert!(raw_request.contains("x-goog-fieldmask: routes.duration,routes.distancemeters"));
    assert!(raw_request.contains("\"travelmode\":\"drive\""));
}
