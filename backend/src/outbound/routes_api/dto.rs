//! DTOs for the upstream `computeRoutes` request and response.
//!
//! Requests always ask for a single traffic-aware driving route in metric
//! units; responses decode into transport DTOs before mapping into a domain
//! [`RouteResult`].

use serde::{Deserialize, Serialize};

use crate::domain::{Coordinate, RouteQuery, RouteResult};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ComputeRoutesRequestDto {
    origin: WaypointDto,
    destination: WaypointDto,
    travel_mode: &'static str,
    routing_preference: &'static str,
    compute_alternate_routes: bool,
    route_modifiers: RouteModifiersDto,
    language_code: &'static str,
    units: &'static str,
}

#[derive(Debug, Serialize)]
struct WaypointDto {
    location: LocationDto,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LocationDto {
    lat_lng: LatLngDto,
}

#[derive(Debug, Serialize)]
struct LatLngDto {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RouteModifiersDto {
    avoid_tolls: bool,
    avoid_highways: bool,
    avoid_ferries: bool,
}

impl WaypointDto {
    fn at(coordinate: Coordinate) -> Self {
        Self {
            location: LocationDto {
                lat_lng: LatLngDto {
                    latitude: coordinate.latitude(),
                    longitude: coordinate.longitude(),
                },
            },
        }
    }
}

impl From<&RouteQuery> for ComputeRoutesRequestDto {
    fn from(query: &RouteQuery) -> Self {
        Self {
            origin: WaypointDto::at(query.origin),
            destination: WaypointDto::at(query.destination),
            travel_mode: "DRIVE",
            routing_preference: "TRAFFIC_AWARE",
            compute_alternate_routes: false,
            route_modifiers: RouteModifiersDto {
                avoid_tolls: false,
                avoid_highways: false,
                avoid_ferries: false,
            },
            language_code: "es-419",
            units: "METRIC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct ComputeRoutesResponseDto {
    #[serde(default)]
    pub(super) routes: Vec<RouteDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct RouteDto {
    // Zero-valued fields are omitted from upstream JSON.
    #[serde(default)]
    distance_meters: u32,
    #[serde(default)]
    duration: String,
    #[serde(default)]
    polyline: PolylineDto,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PolylineDto {
    #[serde(default)]
    encoded_polyline: String,
}

impl RouteDto {
    pub(super) fn into_domain_route(self) -> Result<RouteResult, String> {
        let duration_seconds = parse_duration_seconds(&self.duration)?;
        Ok(RouteResult {
            encoded_path: self.polyline.encoded_polyline,
            distance_meters: self.distance_meters,
            duration_seconds,
            degraded: false,
        })
    }
}

/// Parse an upstream duration of the form `"<digits>s"` into whole seconds.
///
/// Signs, fractions, whitespace, and a missing suffix are all rejected.
///
/// # Examples
/// ```
/// use transit_backend::outbound::routes_api::parse_duration_seconds;
///
/// assert_eq!(parse_duration_seconds("300s"), Ok(300));
/// assert!(parse_duration_seconds("1.5s").is_err());
/// ```
pub fn parse_duration_seconds(raw: &str) -> Result<u32, String> {
    let digits = raw
        .strip_suffix('s')
        .ok_or_else(|| format!("duration {raw:?} lacks the 's' suffix"))?;
    if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(format!("duration {raw:?} is not a whole number of seconds"));
    }
    digits
        .parse::<u32>()
        .map_err(|error| format!("duration {raw:?} is out of range: {error}"))
}
