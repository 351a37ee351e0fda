//! Configuration file handling.
//!
//! This module handles loading `.newswire.toml` and merging it with
//! command-line arguments and environment variables.

use crate::cache::DEFAULT_CACHE_PATH;
use crate::feeds::fetch::DEFAULT_USER_AGENT;
use crate::feeds::registry::DEFAULT_REGISTRY_PATH;
use crate::llm::LlmConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default settings file name.
pub const DEFAULT_CONFIG_FILE: &str = ".newswire.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Feed registry settings.
    #[serde(default)]
    pub feeds: FeedsConfig,

    /// Feed cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP client settings for feed retrieval.
    #[serde(default)]
    pub http: HttpConfig,

    /// Optional LLM narrative settings. The API key only comes from the
    /// environment.
    #[serde(default)]
    pub llm: LlmSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log filter (`error`, `warn`, `info`, `debug`, `trace` or an env-filter directive).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedsConfig {
    /// Path of the feed registry JSON file.
    #[serde(default = "default_feeds_path")]
    pub config_path: String,
}

impl Default for FeedsConfig {
    fn default() -> Self {
        Self {
            config_path: default_feeds_path(),
        }
    }
}

fn default_feeds_path() -> String {
    DEFAULT_REGISTRY_PATH.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Path of the cache JSON file.
    #[serde(default = "default_cache_path")]
    pub path: String,

    /// How long fetched feeds stay fresh.
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: default_cache_path(),
            ttl_hours: default_ttl_hours(),
        }
    }
}

fn default_cache_path() -> String {
    DEFAULT_CACHE_PATH.to_string()
}

fn default_ttl_hours() -> u64 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_http_timeout")]
    pub timeout_seconds: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Feeds fetched in parallel during a refresh.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_http_timeout(),
            user_agent: default_user_agent(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_http_timeout() -> u64 {
    30
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmSettings {
    /// OpenAI-compatible API base URL.
    #[serde(default = "default_llm_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_seconds: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url: default_llm_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            timeout_seconds: default_llm_timeout(),
        }
    }
}

fn default_llm_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_llm_timeout() -> u64 {
    60
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Arguments (and the environment variables clap reads for them) take
    /// precedence over the file. Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref feeds) = args.feeds {
            self.feeds.config_path = feeds.display().to_string();
        }
        if let Some(ttl) = args.cache_ttl_hours {
            self.cache.ttl_hours = ttl;
        }
        if let Some(ref level) = args.log_level {
            self.general.log_level = level.clone();
        }

        // Flags always override
        if let Some(level) = args.log_level_override() {
            self.general.log_level = level.to_string().to_lowercase();
        }
    }

    /// Settings for the narrative writer.
    pub fn llm_config(&self, api_key: Option<String>, organization: Option<String>) -> LlmConfig {
        LlmConfig {
            base_url: self.llm.base_url.clone(),
            model: self.llm.model.clone(),
            temperature: self.llm.temperature,
            timeout_seconds: self.llm.timeout_seconds,
            api_key,
            organization,
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use std::path::PathBuf;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.feeds.config_path, "rss_feeds_config.json");
        assert_eq!(config.cache.path, "rss_feeds_cache.json");
        assert_eq!(config.cache.ttl_hours, 1);
        assert_eq!(config.http.concurrency, 4);
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
log_level = "debug"

[cache]
ttl_hours = 6

[http]
timeout_seconds = 10
concurrency = 8

[llm]
base_url = "http://localhost:8080/v1"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.cache.ttl_hours, 6);
        assert_eq!(config.cache.path, "rss_feeds_cache.json");
        assert_eq!(config.http.timeout_seconds, 10);
        assert_eq!(config.http.concurrency, 8);
        assert_eq!(config.llm.base_url, "http://localhost:8080/v1");
        assert_eq!(config.llm.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_reports_bad_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[cache]\nttl_hours = \"soon\"").unwrap();

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
        assert!(Config::load(&dir.path().join("missing.toml")).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        config.merge_with_args(&args);
        assert_eq!(config.feeds.config_path, "rss_feeds_config.json");
        assert_eq!(config.general.log_level, "info");

        args.feeds = Some(PathBuf::from("/tmp/feeds.json"));
        args.cache_ttl_hours = Some(3);
        args.log_level = Some("warn".to_string());
        config.merge_with_args(&args);
        assert_eq!(config.feeds.config_path, "/tmp/feeds.json");
        assert_eq!(config.cache.ttl_hours, 3);
        assert_eq!(config.general.log_level, "warn");

        args.verbose = true;
        config.merge_with_args(&args);
        assert_eq!(config.general.log_level, "debug");
    }

    #[test]
    fn test_llm_config() {
        let config = Config::default();
        let llm = config.llm_config(Some("sk-test".to_string()), None);
        assert_eq!(llm.base_url, "https://api.openai.com/v1");
        assert_eq!(llm.api_key.as_deref(), Some("sk-test"));
        assert!(llm.organization.is_none());
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[feeds]"));
        assert!(toml_str.contains("[cache]"));
        assert!(toml_str.contains("[http]"));
        assert!(toml_str.contains("[llm]"));
        assert!(!toml_str.contains("api_key"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cache.ttl_hours, 1);
    }
}
