//! Feed configuration, retrieval and processing.
//!
//! The registry keeps the configured feeds, the parser turns RSS/Atom
//! documents into raw entries, and the service ties fetching, caching
//! and article processing together.

pub mod fetch;
pub mod google_alerts;
pub mod parser;
pub mod registry;
pub mod service;
#[cfg(test)]
pub mod testing;

pub use fetch::{FeedError, HttpFetcher};
pub use registry::{FeedRegistry, FeedUpdate, RegistryError};
pub use service::FeedService;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Kind of feed, which decides how entries are extracted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedType {
    GoogleAlerts,
    #[default]
    StandardRss,
    Atom,
    Custom,
}

impl FeedType {
    /// All feed types, in display order.
    pub const ALL: [FeedType; 4] = [
        FeedType::GoogleAlerts,
        FeedType::StandardRss,
        FeedType::Atom,
        FeedType::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeedType::GoogleAlerts => "google_alerts",
            FeedType::StandardRss => "standard_rss",
            FeedType::Atom => "atom",
            FeedType::Custom => "custom",
        }
    }
}

impl fmt::Display for FeedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How often a feed is expected to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum UpdateFrequency {
    #[default]
    #[serde(rename = "1h")]
    Hourly,
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "12h")]
    TwelveHours,
    #[serde(rename = "24h")]
    Daily,
}

impl UpdateFrequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateFrequency::Hourly => "1h",
            UpdateFrequency::SixHours => "6h",
            UpdateFrequency::TwelveHours => "12h",
            UpdateFrequency::Daily => "24h",
        }
    }
}

impl fmt::Display for UpdateFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-feed analysis toggles.
///
/// Unknown keys are kept so hand-edited registries survive a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_sentiment: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract_companies: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detect_trends: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisSettings {
    /// Everything switched on, as for the default feed.
    pub fn all_enabled() -> Self {
        Self {
            track_sentiment: Some(true),
            extract_companies: Some(true),
            detect_trends: Some(true),
            extra: Map::new(),
        }
    }

    pub fn tracks_sentiment(&self) -> bool {
        self.track_sentiment.unwrap_or(false)
    }

    pub fn extracts_companies(&self) -> bool {
        self.extract_companies.unwrap_or(false)
    }

    pub fn detects_trends(&self) -> bool {
        self.detect_trends.unwrap_or(true)
    }
}

fn default_true() -> bool {
    true
}

/// Configuration of a single monitored feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Unique feed id.
    pub id: String,
    /// Human readable name.
    pub name: String,
    /// Feed URL (http or https).
    pub url: String,
    #[serde(rename = "type", default)]
    pub feed_type: FeedType,
    /// Keywords to look for in this feed's articles.
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub update_frequency: UpdateFrequency,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub analysis_settings: AnalysisSettings,
}

impl FeedConfig {
    /// A new enabled feed with default settings.
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            feed_type: FeedType::default(),
            keywords: Vec::new(),
            update_frequency: UpdateFrequency::default(),
            enabled: true,
            analysis_settings: AnalysisSettings::default(),
        }
    }

    /// Whether entries should go through the Google Alerts extraction.
    pub fn is_google_alerts(&self) -> bool {
        self.feed_type == FeedType::GoogleAlerts || google_alerts::is_google_alerts_url(&self.url)
    }
}
