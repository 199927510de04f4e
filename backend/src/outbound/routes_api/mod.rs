//! Upstream routing API adapter.
//!
//! Implements the `RoutingSource` port over the Google Routes
//! `computeRoutes` endpoint.

mod dto;
mod http_source;

pub use dto::parse_duration_seconds;
pub use http_source::{DEFAULT_ROUTES_API_URL, GoogleRoutesHttpSource};
