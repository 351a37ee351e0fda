//! File-backed TTL cache.
//!
//! All entries live in a single JSON file. Each entry carries its own
//! `cached_at` timestamp, so refreshing one feed does not extend the life
//! of the others.

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Default cache file name.
pub const DEFAULT_CACHE_PATH: &str = "rss_feeds_cache.json";

/// Cache key of a feed.
pub fn feed_key(feed_id: &str) -> String {
    format!("feed_{}", feed_id)
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Cache task failed: {0}")]
    Task(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    cached_at: DateTime<Utc>,
    data: Value,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

/// TTL cache persisted to one JSON file.
///
/// Every call does blocking file I/O; async callers go through
/// `spawn_blocking`.
#[derive(Debug, Clone)]
pub struct CacheManager {
    path: PathBuf,
    ttl: Duration,
}

impl CacheManager {
    pub fn new(path: impl Into<PathBuf>, ttl_hours: u64) -> Self {
        Self {
            path: path.into(),
            ttl: Duration::hours(ttl_hours as i64),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.cached_at < self.ttl
    }

    /// Read the cache file. Missing or corrupt files read as empty.
    fn read(&self) -> CacheFile {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return CacheFile::default(),
            Err(e) => {
                warn!("Cache error reading {}: {}", self.path.display(), e);
                return CacheFile::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Cache error: {} is corrupt ({}), ignoring", self.path.display(), e);
            CacheFile::default()
        })
    }

    fn write(&self, file: &CacheFile) -> Result<(), CacheError> {
        let body = serde_json::to_string(file)?;
        let io_err = |source| CacheError::Io {
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
        Ok(())
    }

    /// Fresh value stored under `key`, if any.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let file = self.read();
        let entry = file.entries.get(key)?;

        if !self.is_fresh(entry, Utc::now()) {
            debug!("Cache entry {} expired", key);
            return None;
        }

        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Cache error: entry {} has an unexpected shape ({})", key, e);
                None
            }
        }
    }

    /// Store `value` under `key` and drop expired entries.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), CacheError> {
        let now = Utc::now();
        let mut file = self.read();
        file.entries.retain(|_, entry| self.is_fresh(entry, now));
        file.entries.insert(
            key.to_string(),
            CacheEntry {
                cached_at: now,
                data: serde_json::to_value(value)?,
            },
        );
        self.write(&file)
    }

    /// Drop a single entry.
    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        let mut file = self.read();
        if file.entries.remove(key).is_some() {
            self.write(&file)?;
        }
        Ok(())
    }
}
