//! Arrival-time estimate types.

use std::fmt;

/// Telemetry tag naming the tier that produced an estimate.
///
/// Tags are observability metadata only; callers must not branch on them.
///
/// # Examples
/// ```
/// use transit_backend::domain::EtaSource;
///
/// let simple = EtaSource::new("simple");
/// assert_eq!(simple.as_fallback().as_str(), "simple_fallback");
/// assert_eq!(EtaSource::cache().as_str(), "cache");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EtaSource(String);

impl EtaSource {
    /// Tag for values served from the ETA cache.
    pub const CACHE: &'static str = "cache";
    /// Suffix appended when a fallback strategy answered.
    pub const FALLBACK_SUFFIX: &'static str = "_fallback";

    /// Build a tag from a strategy label.
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    /// Tag for cache hits.
    pub fn cache() -> Self {
        Self::new(Self::CACHE)
    }

    /// Same tag with the fallback suffix appended.
    pub fn as_fallback(&self) -> Self {
        Self(format!("{}{}", self.0, Self::FALLBACK_SUFFIX))
    }

    /// Whether the tag marks a fallback answer.
    pub fn is_fallback(&self) -> bool {
        self.0.ends_with(Self::FALLBACK_SUFFIX)
    }

    /// Borrow the tag.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EtaSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw estimate produced by one ETA strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaEstimate {
    /// Seconds until the next vehicle reaches the stop.
    pub seconds: u32,
    /// Strategy tag.
    pub source: EtaSource,
}

impl EtaEstimate {
    /// Build an estimate.
    pub fn new(seconds: u32, source: EtaSource) -> Self {
        Self { seconds, source }
    }
}

/// Estimate returned by the ETA resolver, tagged with the tier that served it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EtaResult {
    /// Seconds until arrival.
    pub seconds: u32,
    /// `cache`, the primary strategy tag, or the fallback tag with suffix.
    pub source: EtaSource,
}

impl From<EtaEstimate> for EtaResult {
    fn from(value: EtaEstimate) -> Self {
        Self {
            seconds: value.seconds,
            source: value.source,
        }
    }
}
