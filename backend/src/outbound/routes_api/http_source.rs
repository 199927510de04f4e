//! Reqwest-backed routing source for the Google Routes `computeRoutes` API.
//!
//! This adapter owns transport details only: request serialisation, the
//! response field mask, timeout and HTTP error mapping, and decoding the
//! first candidate route.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use zeroize::Zeroizing;

use super::dto::{ComputeRoutesRequestDto, ComputeRoutesResponseDto};
use crate::domain::ports::{RoutingSource, RoutingSourceError};
use crate::domain::{RouteQuery, RouteResult};

/// Default upstream endpoint.
pub const DEFAULT_ROUTES_API_URL: &str =
    "https://routes.googleapis.com/directions/v2:computeRoutes";

const API_KEY_HEADER: &str = "X-Goog-Api-Key";
const FIELD_MASK_HEADER: &str = "X-Goog-FieldMask";
const FIELD_MASK: &str = "routes.duration,routes.distanceMeters,routes.polyline.encodedPolyline";

/// Routing source that POSTs one `computeRoutes` request per call.
pub struct GoogleRoutesHttpSource {
    client: Client,
    endpoint: Url,
    api_key: Zeroizing<String>,
}

impl GoogleRoutesHttpSource {
    /// Build an adapter using a reqwest client with an explicit request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(
        endpoint: Url,
        api_key: Zeroizing<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }
}

#[async_trait]
impl RoutingSource for GoogleRoutesHttpSource {
    async fn fetch_route(&self, query: &RouteQuery) -> Result<RouteResult, RoutingSourceError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .header(API_KEY_HEADER, self.api_key.as_str())
            .header(FIELD_MASK_HEADER, FIELD_MASK)
            .json(&ComputeRoutesRequestDto::from(query))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        parse_first_route(body.as_ref())
    }
}

fn parse_first_route(body: &[u8]) -> Result<RouteResult, RoutingSourceError> {
    let decoded: ComputeRoutesResponseDto = serde_json::from_slice(body).map_err(|error| {
        RoutingSourceError::decode(format!("invalid computeRoutes payload: {error}"))
    })?;
    let first = decoded
        .routes
        .into_iter()
        .next()
        .ok_or_else(RoutingSourceError::no_routes)?;
    first.into_domain_route().map_err(RoutingSourceError::decode)
}

fn map_transport_error(error: reqwest::Error) -> RoutingSourceError {
    if error.is_timeout() {
        RoutingSourceError::timeout(error.to_string())
    } else {
        RoutingSourceError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> RoutingSourceError {
    let body_preview = body_preview(body);
    let message = if body_preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        format!("status {}: {}", status.as_u16(), body_preview)
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
            RoutingSourceError::timeout(message)
        }
        _ => RoutingSourceError::status(message),
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}
