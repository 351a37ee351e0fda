//! Test doubles for feed retrieval.

use super::fetch::{FeedError, FeedFetcher};
use super::registry::FeedRegistry;
use super::service::FeedService;
use super::{AnalysisSettings, FeedConfig};
use crate::cache::CacheManager;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Serves canned documents by URL and counts requests.
#[derive(Default)]
pub struct FakeFetcher {
    bodies: Mutex<HashMap<String, String>>,
    calls: AtomicUsize,
}

impl FakeFetcher {
    pub fn with(self, url: &str, body: String) -> Self {
        self.set(url, body);
        self
    }

    pub fn set(&self, url: &str, body: String) {
        if let Ok(mut bodies) = self.bodies.lock() {
            bodies.insert(url.to_string(), body);
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FeedError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies.lock().ok().and_then(|b| b.get(url).cloned());
        body.ok_or_else(|| FeedError::Connect {
            url: url.to_string(),
            message: "connection refused".to_string(),
        })
    }
}

/// An RSS 2.0 document whose items were published `hours_ago` before now.
/// A negative age leaves the item undated.
pub fn rss_document(title: &str, items: &[(&str, &str, i64)]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\"?><rss version=\"2.0\"><channel><title>{}</title>\
         <link>https://{}.example.com/</link>",
        title,
        title.to_lowercase().replace(' ', "")
    );
    for (i, (item_title, description, hours_ago)) in items.iter().enumerate() {
        let published = if *hours_ago < 0 {
            String::new()
        } else {
            format!(
                "<pubDate>{}</pubDate>",
                (Utc::now() - Duration::hours(*hours_ago)).to_rfc2822()
            )
        };
        xml.push_str(&format!(
            "<item><title>{}</title><link>https://news.example.com/{}/{}</link>\
             <description>{}</description>{}</item>",
            item_title, title.len(), i, description, published
        ));
    }
    xml.push_str("</channel></rss>");
    xml
}

/// A feed config with every analysis toggle on.
pub fn feed(id: &str, url: &str, keywords: &[&str]) -> FeedConfig {
    let mut cfg = FeedConfig::new(id, format!("Feed {}", id), url);
    cfg.keywords = keywords.iter().map(|k| k.to_string()).collect();
    cfg.analysis_settings = AnalysisSettings::all_enabled();
    cfg
}

/// A service over a temporary registry (default feed removed) and cache.
pub struct TestEnv {
    pub dir: TempDir,
    pub fetcher: Arc<FakeFetcher>,
    pub service: Arc<FeedService>,
}

impl TestEnv {
    pub fn new(feeds: Vec<FeedConfig>, fetcher: FakeFetcher) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let mut registry = FeedRegistry::load(dir.path().join("feeds.json"));
        registry.remove("google_alerts_ai").expect("default feed");
        for cfg in feeds {
            registry.add(cfg).expect("add feed");
        }

        let cache = CacheManager::new(dir.path().join("cache.json"), 1);
        let fetcher = Arc::new(fetcher);
        let service = Arc::new(FeedService::new(registry, cache, fetcher.clone(), 4));

        Self {
            dir,
            fetcher,
            service,
        }
    }
}
