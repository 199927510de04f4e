//! Runtime settings loaded via OrthoConfig.
//!
//! Values come from CLI flags, `TRANSIT_*` environment variables, or a
//! configuration file. Every tuning knob is optional; accessors apply the
//! defaults and validate.

use std::fmt;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;
use thiserror::Error;
use url::Url;
use zeroize::Zeroizing;

use crate::domain::{EtaResolverConfig, EtaSchedule, EtaScheduleError, RouteResolverConfig};
use crate::outbound::routes_api::DEFAULT_ROUTES_API_URL;

const DEFAULT_ROUTES_TIMEOUT_SECS: u64 = 5;
const DEFAULT_ROUTE_CACHE_TTL_SECS: u64 = 120;
const DEFAULT_ETA_CACHE_TTL_SECS: u64 = 60;
const DEFAULT_CACHE_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MAX_PENDING_CACHE_WRITES: usize = 64;
const DEFAULT_DB_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TELEMETRY_FRESHNESS_SECS: u64 = 300;
const DEFAULT_OFF_PEAK_BASE_SECS: u32 = 180;
const DEFAULT_PEAK_BASE_SECS: u32 = 360;
const DEFAULT_PEAK_HOURS: [u32; 4] = [7, 8, 17, 18];

/// Errors raised while interpreting settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The routing endpoint is not a valid URL.
    #[error("invalid routes API URL {value:?}: {source}")]
    InvalidRoutesApiUrl {
        /// Rejected URL text.
        value: String,
        /// Underlying failure.
        #[source]
        source: url::ParseError,
    },
    /// A peak hour is outside the day.
    #[error("invalid peak hours {hours:?}")]
    PeakHourOutOfRange {
        /// Configured hours.
        hours: Vec<u32>,
        /// Underlying failure.
        #[source]
        source: EtaScheduleError,
    },
    /// A database URL is required to look up stops.
    #[error("TRANSIT_DATABASE_URL is required")]
    MissingDatabaseUrl,
}

/// Settings for the transit route and ETA backend.
#[derive(Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "TRANSIT")]
pub struct TransitSettings {
    /// Upstream `computeRoutes` endpoint.
    #[serde(default, deserialize_with = "layered::optional_text")]
    pub routes_api_url: Option<String>,
    /// API key sent to the routing endpoint. Without it every route degrades.
    #[serde(default, deserialize_with = "layered::optional_text")]
    pub routes_api_key: Option<String>,
    /// Per-call routing timeout in seconds.
    pub routes_timeout_secs: Option<u64>,
    /// Route cache lifetime in seconds.
    pub route_cache_ttl_secs: Option<u64>,
    /// ETA cache lifetime in seconds.
    pub eta_cache_ttl_secs: Option<u64>,
    /// Cache read and write deadline in seconds.
    pub cache_timeout_secs: Option<u64>,
    /// Detached route cache writes allowed in flight.
    pub max_pending_cache_writes: Option<usize>,
    /// Off-peak base wait for the schedule strategy.
    pub eta_off_peak_base_secs: Option<u32>,
    /// Peak base wait for the schedule strategy.
    pub eta_peak_base_secs: Option<u32>,
    /// Local peak hours, e.g. `7,8,17,18` in the environment.
    #[serde(default, deserialize_with = "layered::optional_hours")]
    pub eta_peak_hours: Option<Vec<u32>>,
    /// Use live vehicle positions first, falling back to the schedule.
    #[ortho_config(default = false)]
    #[serde(default)]
    pub eta_telemetry_enabled: bool,
    /// Age in seconds after which a vehicle position is ignored.
    pub telemetry_freshness_secs: Option<u64>,
    /// Redis URL; caches stay in-process when unset.
    #[serde(default, deserialize_with = "layered::optional_text")]
    pub redis_url: Option<String>,
    /// PostgreSQL URL for stops and vehicle positions.
    #[serde(default, deserialize_with = "layered::optional_text")]
    pub database_url: Option<String>,
    /// Database query timeout in seconds.
    pub db_timeout_secs: Option<u64>,
}

impl fmt::Debug for TransitSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransitSettings")
            .field("routes_api_url", &self.routes_api_url)
            .field(
                "routes_api_key",
                &self.routes_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("routes_timeout_secs", &self.routes_timeout_secs)
            .field("route_cache_ttl_secs", &self.route_cache_ttl_secs)
            .field("eta_cache_ttl_secs", &self.eta_cache_ttl_secs)
            .field("cache_timeout_secs", &self.cache_timeout_secs)
            .field("max_pending_cache_writes", &self.max_pending_cache_writes)
            .field("eta_off_peak_base_secs", &self.eta_off_peak_base_secs)
            .field("eta_peak_base_secs", &self.eta_peak_base_secs)
            .field("eta_peak_hours", &self.eta_peak_hours)
            .field("eta_telemetry_enabled", &self.eta_telemetry_enabled)
            .field("telemetry_freshness_secs", &self.telemetry_freshness_secs)
            .field("redis_url", &self.redis_url.as_ref().map(|_| "<redacted>"))
            .field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
            .field("db_timeout_secs", &self.db_timeout_secs)
            .finish()
    }
}

impl TransitSettings {
    /// Routing endpoint, falling back to the public Google Routes URL.
    pub fn routes_api_url(&self) -> Result<Url, SettingsError> {
        let raw = self
            .routes_api_url
            .as_deref()
            .unwrap_or(DEFAULT_ROUTES_API_URL);
        Url::parse(raw).map_err(|source| SettingsError::InvalidRoutesApiUrl {
            value: raw.to_owned(),
            source,
        })
    }

    /// API key, wiped from memory when dropped. Empty when unset.
    pub fn routes_api_key(&self) -> Zeroizing<String> {
        Zeroizing::new(self.routes_api_key.clone().unwrap_or_default())
    }

    /// Per-call routing timeout.
    pub fn routes_timeout(&self) -> Duration {
        Duration::from_secs(
            self.routes_timeout_secs
                .unwrap_or(DEFAULT_ROUTES_TIMEOUT_SECS),
        )
    }

    fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_secs.unwrap_or(DEFAULT_CACHE_TIMEOUT_SECS))
    }

    /// Route resolver tuning.
    pub fn route_resolver_config(&self) -> RouteResolverConfig {
        RouteResolverConfig {
            cache_ttl: Duration::from_secs(
                self.route_cache_ttl_secs
                    .unwrap_or(DEFAULT_ROUTE_CACHE_TTL_SECS),
            ),
            cache_read_timeout: self.cache_timeout(),
            cache_write_timeout: self.cache_timeout(),
            max_pending_writes: self
                .max_pending_cache_writes
                .unwrap_or(DEFAULT_MAX_PENDING_CACHE_WRITES),
        }
    }

    /// ETA resolver tuning.
    pub fn eta_resolver_config(&self) -> EtaResolverConfig {
        EtaResolverConfig {
            cache_ttl: Duration::from_secs(
                self.eta_cache_ttl_secs
                    .unwrap_or(DEFAULT_ETA_CACHE_TTL_SECS),
            ),
            cache_read_timeout: self.cache_timeout(),
            cache_write_timeout: self.cache_timeout(),
        }
    }

    /// Peak-hour schedule for the default ETA strategy.
    pub fn eta_schedule(&self) -> Result<EtaSchedule, SettingsError> {
        let hours = self
            .eta_peak_hours
            .clone()
            .unwrap_or_else(|| DEFAULT_PEAK_HOURS.to_vec());
        EtaSchedule::new(
            self.eta_off_peak_base_secs
                .unwrap_or(DEFAULT_OFF_PEAK_BASE_SECS),
            self.eta_peak_base_secs.unwrap_or(DEFAULT_PEAK_BASE_SECS),
            hours.iter().copied(),
        )
        .map_err(|source| SettingsError::PeakHourOutOfRange { hours, source })
    }

    /// Freshness window for telemetry positions.
    pub fn telemetry_freshness(&self) -> Duration {
        Duration::from_secs(
            self.telemetry_freshness_secs
                .unwrap_or(DEFAULT_TELEMETRY_FRESHNESS_SECS),
        )
    }

    /// Database query timeout.
    pub fn db_timeout(&self) -> Duration {
        Duration::from_secs(self.db_timeout_secs.unwrap_or(DEFAULT_DB_TIMEOUT_SECS))
    }

    /// Database URL, required for stop lookups.
    pub fn database_url(&self) -> Result<&str, SettingsError> {
        self.database_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(SettingsError::MissingDatabaseUrl)
    }
}

/// Deserialisers for values the environment layer delivers as typed data.
///
/// `TRANSIT_ROUTES_API_KEY=12345` arrives as a number and
/// `TRANSIT_ETA_PEAK_HOURS=7,8` as a list of strings, so these accept each
/// shape a layer can produce.
mod layered {
    use std::fmt;

    use serde::de::{self, Deserializer, SeqAccess, Unexpected, Visitor};
    use serde::Deserialize;

    pub(super) fn optional_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Text>::deserialize(deserializer).map(|text| text.map(|Text(value)| value))
    }

    pub(super) fn optional_hours<'de, D>(deserializer: D) -> Result<Option<Vec<u32>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<Hours>::deserialize(deserializer).map(|hours| hours.map(|Hours(list)| list))
    }

    /// Text setting; scalars keep their literal form and split lists rejoin.
    struct Text(String);

    impl<'de> Deserialize<'de> for Text {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(TextVisitor).map(Text)
        }
    }

    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = String;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a string or scalar")
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<String, E> {
            Ok(value.to_owned())
        }

        fn visit_string<E: de::Error>(self, value: String) -> Result<String, E> {
            Ok(value)
        }

        fn visit_bool<E: de::Error>(self, value: bool) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_f64<E: de::Error>(self, value: f64) -> Result<String, E> {
            Ok(value.to_string())
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<String, A::Error> {
            let mut parts = Vec::new();
            while let Some(Text(part)) = seq.next_element::<Text>()? {
                parts.push(part);
            }
            Ok(parts.join(","))
        }
    }

    /// One hour of the day as a number or numeric string.
    struct Hour(u32);

    impl<'de> Deserialize<'de> for Hour {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(HourVisitor).map(Hour)
        }
    }

    struct HourVisitor;

    impl<'de> Visitor<'de> for HourVisitor {
        type Value = u32;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an hour of the day")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<u32, E> {
            u32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Unsigned(value), &self))
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<u32, E> {
            u32::try_from(value).map_err(|_| E::invalid_value(Unexpected::Signed(value), &self))
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<u32, E> {
            value
                .trim()
                .parse()
                .map_err(|_| E::invalid_value(Unexpected::Str(value), &self))
        }
    }

    /// Hour list from a single hour, a comma-separated string, or a sequence.
    struct Hours(Vec<u32>);

    impl<'de> Deserialize<'de> for Hours {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            deserializer.deserialize_any(HoursVisitor).map(Hours)
        }
    }

    struct HoursVisitor;

    impl<'de> Visitor<'de> for HoursVisitor {
        type Value = Vec<u32>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list of hours")
        }

        fn visit_u64<E: de::Error>(self, value: u64) -> Result<Vec<u32>, E> {
            HourVisitor.visit_u64(value).map(|hour| vec![hour])
        }

        fn visit_i64<E: de::Error>(self, value: i64) -> Result<Vec<u32>, E> {
            HourVisitor.visit_i64(value).map(|hour| vec![hour])
        }

        fn visit_str<E: de::Error>(self, value: &str) -> Result<Vec<u32>, E> {
            value
                .split(',')
                .filter(|entry| !entry.trim().is_empty())
                .map(|entry| HourVisitor.visit_str(entry))
                .collect()
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Vec<u32>, A::Error> {
            let mut hours = Vec::new();
            while let Some(Hour(hour)) = seq.next_element::<Hour>()? {
                hours.push(hour);
            }
            Ok(hours)
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for settings parsing and defaults.

    use super::*;
    use std::ffi::OsString;

    use env_lock::lock_env;
    use rstest::rstest;

    const VARS: [&str; 8] = [
        "TRANSIT_ROUTES_API_URL",
        "TRANSIT_ROUTES_API_KEY",
        "TRANSIT_ROUTE_CACHE_TTL_SECS",
        "TRANSIT_CACHE_TIMEOUT_SECS",
        "TRANSIT_ETA_PEAK_HOURS",
        "TRANSIT_ETA_PEAK_BASE_SECS",
        "TRANSIT_ETA_TELEMETRY_ENABLED",
        "TRANSIT_DATABASE_URL",
    ];

    fn load_from_empty_args() -> TransitSettings {
        TransitSettings::load_from_iter([OsString::from("transit-lookup")])
            .expect("config should load")
    }

    /// Every known variable, unset unless named in `overrides`.
    fn env_with(overrides: &[(&str, &str)]) -> Vec<(&'static str, Option<String>)> {
        VARS.iter()
            .map(|name| {
                let value = overrides
                    .iter()
                    .find(|(key, _)| key == name)
                    .map(|(_, value)| (*value).to_owned());
                (*name, value)
            })
            .collect()
    }

    #[rstest]
    fn default_values_are_used_when_missing() {
        let _guard = lock_env(env_with(&[]));

        let settings = load_from_empty_args();
        assert_eq!(
            settings.routes_api_url().expect("default url").as_str(),
            DEFAULT_ROUTES_API_URL
        );
        assert!(settings.routes_api_key().is_empty());
        assert_eq!(settings.route_resolver_config(), RouteResolverConfig::default());
        assert_eq!(settings.eta_resolver_config(), EtaResolverConfig::default());
        assert_eq!(settings.eta_schedule().expect("schedule"), EtaSchedule::default());
        assert!(!settings.eta_telemetry_enabled);
        assert!(matches!(
            settings.database_url(),
            Err(SettingsError::MissingDatabaseUrl)
        ));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env(env_with(&[
            ("TRANSIT_ROUTES_API_KEY", "secret"),
            ("TRANSIT_ROUTE_CACHE_TTL_SECS", "300"),
            ("TRANSIT_CACHE_TIMEOUT_SECS", "2"),
            ("TRANSIT_ETA_PEAK_HOURS", "6, 9"),
            ("TRANSIT_ETA_PEAK_BASE_SECS", "400"),
            ("TRANSIT_ETA_TELEMETRY_ENABLED", "true"),
            ("TRANSIT_DATABASE_URL", "postgres://localhost/transit"),
        ]));

        let settings = load_from_empty_args();
        assert_eq!(settings.routes_api_key().as_str(), "secret");
        let routes = settings.route_resolver_config();
        assert_eq!(routes.cache_ttl, Duration::from_secs(300));
        assert_eq!(routes.cache_read_timeout, Duration::from_secs(2));
        let schedule = settings.eta_schedule().expect("schedule");
        assert_eq!(schedule.peak_hours().collect::<Vec<_>>(), vec![6, 9]);
        assert_eq!(schedule.base_for_hour(6), 400);
        assert!(settings.eta_telemetry_enabled);
        assert_eq!(
            settings.database_url().expect("url"),
            "postgres://localhost/transit"
        );
    }

    #[rstest]
    #[case("9", vec![9])]
    #[case("7,8,17,18", vec![7, 8, 17, 18])]
    #[case("6, 9", vec![6, 9])]
    fn peak_hours_load_from_the_environment(#[case] raw: &str, #[case] expected: Vec<u32>) {
        let _guard = lock_env(env_with(&[("TRANSIT_ETA_PEAK_HOURS", raw)]));

        let schedule = load_from_empty_args().eta_schedule().expect("schedule");
        assert_eq!(schedule.peak_hours().collect::<Vec<_>>(), expected);
    }

    #[rstest]
    #[case("7,eight")]
    #[case("7,-1")]
    fn unparsable_peak_hours_fail_to_load(#[case] raw: &str) {
        let _guard = lock_env(env_with(&[("TRANSIT_ETA_PEAK_HOURS", raw)]));

        let result = TransitSettings::load_from_iter([OsString::from("transit-lookup")]);
        assert!(result.is_err());
    }

    #[rstest]
    fn numeric_api_key_loads_as_text() {
        let _guard = lock_env(env_with(&[("TRANSIT_ROUTES_API_KEY", "12345")]));

        let settings = load_from_empty_args();
        assert_eq!(settings.routes_api_key().as_str(), "12345");
    }

    #[rstest]
    fn multi_host_database_url_keeps_its_commas() {
        let url = "postgres://db1:5432,db2:5432/transit";
        let _guard = lock_env(env_with(&[("TRANSIT_DATABASE_URL", url)]));

        let settings = load_from_empty_args();
        assert_eq!(settings.database_url().expect("url"), url);
    }

    #[rstest]
    fn file_style_values_deserialise() {
        let settings: TransitSettings = serde_json::from_value(serde_json::json!({
            "routes_api_key": 987,
            "eta_peak_hours": [6, "7"],
            "redis_url": "redis://cache:6379",
        }))
        .expect("settings deserialise");
        assert_eq!(settings.routes_api_key().as_str(), "987");
        assert_eq!(settings.eta_peak_hours, Some(vec![6, 7]));
        assert_eq!(settings.redis_url.as_deref(), Some("redis://cache:6379"));
        assert!(settings.routes_api_url.is_none());
        assert!(!settings.eta_telemetry_enabled);
    }

    #[rstest]
    fn out_of_range_peak_hours_are_rejected() {
        let _guard = lock_env(env_with(&[("TRANSIT_ETA_PEAK_HOURS", "7,25")]));

        let error = load_from_empty_args()
            .eta_schedule()
            .expect_err("hour out of range");
        let SettingsError::PeakHourOutOfRange { hours, .. } = error else {
            panic!("expected out of range error, got {error:?}");
        };
        assert_eq!(hours, vec![7, 25]);
    }

    #[rstest]
    fn debug_output_redacts_secrets() {
        let _guard = lock_env(env_with(&[("TRANSIT_ROUTES_API_KEY", "super-secret")]));

        let rendered = format!("{:?}", load_from_empty_args());
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
