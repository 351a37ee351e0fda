//! Feed registry.
//!
//! Keeps the configured feeds in memory, in insertion order, and persists
//! them as a JSON document of the form `{"feeds": [...], "last_updated": ...}`.

use super::{AnalysisSettings, FeedConfig, FeedType, UpdateFrequency};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default registry file name.
pub const DEFAULT_REGISTRY_PATH: &str = "rss_feeds_config.json";

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Feed '{0}' already exists")]
    Duplicate(String),

    #[error("Feed '{0}' not found")]
    NotFound(String),

    #[error("Invalid feed configuration: {0}")]
    Invalid(String),

    #[error("Failed to write feed registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize feed registry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Registry file layout on disk.
#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    feeds: Vec<Value>,
}

#[derive(Serialize)]
struct RegistryFileRef<'a> {
    feeds: &'a [FeedConfig],
    last_updated: DateTime<Utc>,
}

/// Partial update of a feed. The id cannot change.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedUpdate {
    pub name: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub feed_type: Option<FeedType>,
    pub keywords: Option<Vec<String>>,
    pub update_frequency: Option<UpdateFrequency>,
    pub enabled: Option<bool>,
    pub analysis_settings: Option<AnalysisSettings>,
}

impl FeedUpdate {
    pub fn is_empty(&self) -> bool {
        *self == FeedUpdate::default()
    }

    fn apply_to(self, feed: &mut FeedConfig) {
        if let Some(name) = self.name {
            feed.name = name;
        }
        if let Some(url) = self.url {
            feed.url = url;
        }
        if let Some(feed_type) = self.feed_type {
            feed.feed_type = feed_type;
        }
        if let Some(keywords) = self.keywords {
            feed.keywords = keywords;
        }
        if let Some(frequency) = self.update_frequency {
            feed.update_frequency = frequency;
        }
        if let Some(enabled) = self.enabled {
            feed.enabled = enabled;
        }
        if let Some(settings) = self.analysis_settings {
            feed.analysis_settings = settings;
        }
    }
}

/// Overview of the registry contents.
#[derive(Debug, Clone, Serialize)]
pub struct RegistrySummary {
    pub total_feeds: usize,
    pub enabled_feeds: usize,
    pub disabled_feeds: usize,
    pub feed_types: BTreeMap<String, usize>,
    pub config_file: String,
    pub last_loaded: DateTime<Utc>,
}

/// The default feed set: one Google Alerts feed on AI topics.
pub fn default_feeds() -> Vec<FeedConfig> {
    vec![FeedConfig {
        feed_type: FeedType::GoogleAlerts,
        keywords: vec![
            "AI".to_string(),
            "artificial intelligence".to_string(),
            "machine learning".to_string(),
        ],
        analysis_settings: AnalysisSettings::all_enabled(),
        ..FeedConfig::new(
            "google_alerts_ai",
            "Google Alerts - AI",
            "https://www.google.com/alerts/feeds/01516800834195557068/15279974359414489902",
        )
    }]
}

/// Check the fields serde cannot check for us.
pub fn validate(feed: &FeedConfig) -> Result<(), RegistryError> {
    if feed.id.trim().is_empty() {
        return Err(RegistryError::Invalid("feed id is required".to_string()));
    }
    if feed.name.trim().is_empty() {
        return Err(RegistryError::Invalid("feed name is required".to_string()));
    }
    if feed.url.trim().is_empty() {
        return Err(RegistryError::Invalid("feed URL is required".to_string()));
    }
    if !feed.url.starts_with("http://") && !feed.url.starts_with("https://") {
        return Err(RegistryError::Invalid(
            "feed URL must start with http:// or https://".to_string(),
        ));
    }
    Ok(())
}

/// Configured feeds backed by a JSON file.
#[derive(Debug)]
pub struct FeedRegistry {
    path: PathBuf,
    feeds: Vec<FeedConfig>,
    last_loaded: DateTime<Utc>,
}

impl FeedRegistry {
    /// Load the registry from `path`.
    ///
    /// A missing or unparsable file is replaced by the default feed set.
    /// Entries that fail to deserialize or validate are skipped.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let mut registry = Self {
            path: path.into(),
            feeds: Vec::new(),
            last_loaded: Utc::now(),
        };
        registry.read_or_install_defaults();
        registry
    }

    fn read_or_install_defaults(&mut self) {
        self.feeds.clear();
        self.last_loaded = Utc::now();

        match std::fs::read_to_string(&self.path) {
            Ok(content) => match serde_json::from_str::<RegistryFile>(&content) {
                Ok(file) => {
                    for raw in file.feeds {
                        self.insert_loaded(raw);
                    }
                    info!(
                        "Loaded {} feed configurations from {}",
                        self.feeds.len(),
                        self.path.display()
                    );
                    return;
                }
                Err(e) => {
                    error!("Error parsing feed registry {}: {}", self.path.display(), e);
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No feed registry found, creating default configuration");
            }
            Err(e) => {
                error!("Error reading feed registry {}: {}", self.path.display(), e);
            }
        }

        self.feeds = default_feeds();
        if let Err(e) = self.save() {
            warn!("Could not persist default feed registry: {}", e);
        }
    }

    fn insert_loaded(&mut self, raw: Value) {
        let feed: FeedConfig = match serde_json::from_value(raw) {
            Ok(feed) => feed,
            Err(e) => {
                warn!("Skipping invalid feed entry: {}", e);
                return;
            }
        };
        if let Err(e) = validate(&feed) {
            warn!("Skipping feed '{}': {}", feed.id, e);
            return;
        }
        if self.contains(&feed.id) {
            warn!("Skipping duplicate feed id '{}'", feed.id);
            return;
        }
        self.feeds.push(feed);
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the registry, replacing the file atomically.
    pub fn save(&self) -> Result<(), RegistryError> {
        let body = serde_json::to_string_pretty(&RegistryFileRef {
            feeds: &self.feeds,
            last_updated: Utc::now(),
        })?;

        let io_err = |source| RegistryError::Io {
            path: self.path.clone(),
            source,
        };

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent).map_err(io_err)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&parent).map_err(io_err)?;
        tmp.write_all(body.as_bytes()).map_err(io_err)?;
        tmp.persist(&self.path).map_err(|e| io_err(e.error))?;

        debug!("Saved feed registry to {}", self.path.display());
        Ok(())
    }

    /// Drop in-memory state and read the file again.
    pub fn reload(&mut self) {
        self.read_or_install_defaults();
    }

    pub fn contains(&self, id: &str) -> bool {
        self.feeds.iter().any(|f| f.id == id)
    }

    pub fn get(&self, id: &str) -> Option<&FeedConfig> {
        self.feeds.iter().find(|f| f.id == id)
    }

    pub fn all(&self) -> &[FeedConfig] {
        &self.feeds
    }

    pub fn enabled(&self) -> Vec<FeedConfig> {
        self.feeds.iter().filter(|f| f.enabled).cloned().collect()
    }

    pub fn by_type(&self, feed_type: FeedType) -> Vec<&FeedConfig> {
        self.feeds
            .iter()
            .filter(|f| f.feed_type == feed_type)
            .collect()
    }

    /// Add a new feed and persist.
    pub fn add(&mut self, feed: FeedConfig) -> Result<(), RegistryError> {
        if self.contains(&feed.id) {
            return Err(RegistryError::Duplicate(feed.id));
        }
        validate(&feed)?;

        info!("Added feed: {}", feed.name);
        self.feeds.push(feed);
        self.save()
    }

    /// Apply a partial update and persist. Nothing changes if the result is invalid.
    pub fn update(&mut self, id: &str, update: FeedUpdate) -> Result<&FeedConfig, RegistryError> {
        let index = self
            .feeds
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let mut candidate = self.feeds[index].clone();
        update.apply_to(&mut candidate);
        validate(&candidate)?;

        self.feeds[index] = candidate;
        self.save()?;
        info!("Updated feed: {}", id);
        Ok(&self.feeds[index])
    }

    /// Remove a feed and persist.
    pub fn remove(&mut self, id: &str) -> Result<FeedConfig, RegistryError> {
        let index = self
            .feeds
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))?;

        let removed = self.feeds.remove(index);
        self.save()?;
        info!("Removed feed: {}", id);
        Ok(removed)
    }

    pub fn summary(&self) -> RegistrySummary {
        let enabled = self.feeds.iter().filter(|f| f.enabled).count();
        let feed_types = FeedType::ALL
            .iter()
            .map(|t| (t.to_string(), self.by_type(*t).len()))
            .collect();

        RegistrySummary {
            total_feeds: self.feeds.len(),
            enabled_feeds: enabled,
            disabled_feeds: self.feeds.len() - enabled,
            feed_types,
            config_file: self.path.display().to_string(),
            last_loaded: self.last_loaded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry_in(dir: &TempDir) -> FeedRegistry {
        FeedRegistry::load(dir.path().join("feeds.json"))
    }

    #[test]
    fn test_missing_file_installs_defaults() {
        let dir = TempDir::new().unwrap();
        let registry = registry_in(&dir);

        assert_eq!(registry.all().len(), 1);
        let feed = registry.get("google_alerts_ai").unwrap();
        assert_eq!(feed.feed_type, FeedType::GoogleAlerts);
        assert!(feed.analysis_settings.extracts_companies());
        assert_eq!(feed.update_frequency, UpdateFrequency::Hourly);
        assert!(feed.enabled);
        assert_eq!(feed.keywords.len(), 3);
        assert!(dir.path().join("feeds.json").exists());
    }

    #[test]
    fn test_corrupt_file_installs_defaults() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("feeds.json"), "{not json").unwrap();

        let registry = registry_in(&dir);
        assert!(registry.contains("google_alerts_ai"));
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let content = serde_json::json!({
            "feeds": [
                {"id": "ok", "name": "Ok", "url": "https://ok.example/rss"},
                {"id": "ftp", "name": "Ftp", "url": "ftp://bad.example"},
                {"id": "typ", "name": "Typ", "url": "https://x", "type": "podcast"}
            ]
        });
        std::fs::write(dir.path().join("feeds.json"), content.to_string()).unwrap();

        let registry = registry_in(&dir);
        let ids: Vec<_> = registry.all().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["ok"]);
    }

    #[test]
    fn test_add_persists_and_rejects_duplicates() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let feed = FeedConfig::new("tc", "TechCrunch", "https://techcrunch.com/feed/");
        registry.add(feed.clone()).unwrap();
        assert!(matches!(
            registry.add(feed),
            Err(RegistryError::Duplicate(id)) if id == "tc"
        ));

        let reloaded = registry_in(&dir);
        let ids: Vec<_> = reloaded.all().iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["google_alerts_ai", "tc"]);
    }

    #[test]
    fn test_add_rejects_bad_url() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let err = registry
            .add(FeedConfig::new("x", "X", "example.com/rss"))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Invalid(_)));
        assert!(!registry.contains("x"));
    }

    #[test]
    fn test_failed_update_leaves_feed_unchanged() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let update = FeedUpdate {
            url: Some("not-a-url".to_string()),
            enabled: Some(false),
            ..Default::default()
        };
        assert!(registry.update("google_alerts_ai", update).is_err());

        let feed = registry.get("google_alerts_ai").unwrap();
        assert!(feed.enabled);
        assert!(feed.url.starts_with("https://"));
    }

    #[test]
    fn test_update_and_remove() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);

        let update: FeedUpdate =
            serde_json::from_value(serde_json::json!({"enabled": false, "update_frequency": "6h"}))
                .unwrap();
        let feed = registry.update("google_alerts_ai", update).unwrap();
        assert!(!feed.enabled);
        assert_eq!(feed.update_frequency, UpdateFrequency::SixHours);
        assert!(registry.enabled().is_empty());

        registry.remove("google_alerts_ai").unwrap();
        assert!(matches!(
            registry.remove("google_alerts_ai"),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_rejects_unknown_fields() {
        let parsed = serde_json::from_value::<FeedUpdate>(serde_json::json!({"colour": "red"}));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_summary_counts() {
        let dir = TempDir::new().unwrap();
        let mut registry = registry_in(&dir);
        let mut feed = FeedConfig::new("tc", "TechCrunch", "https://techcrunch.com/feed/");
        feed.enabled = false;
        registry.add(feed).unwrap();

        let summary = registry.summary();
        assert_eq!(summary.total_feeds, 2);
        assert_eq!(summary.enabled_feeds, 1);
        assert_eq!(summary.disabled_feeds, 1);
        assert_eq!(summary.feed_types["google_alerts"], 1);
        assert_eq!(summary.feed_types["standard_rss"], 1);
        assert_eq!(summary.feed_types["atom"], 0);
        assert_eq!(registry.by_type(FeedType::StandardRss).len(), 1);
    }
}
