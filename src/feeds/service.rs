//! Feed service.
//!
//! Fetches configured feeds, turns their entries into articles, caches
//! the result and answers article queries over time windows.

use super::fetch::{FeedError, FeedFetcher};
use super::google_alerts;
use super::parser::{parse_feed, RawEntry, RawFeed};
use super::registry::{FeedRegistry, FeedUpdate, RegistryError, RegistrySummary};
use super::FeedConfig;
use crate::analysis::{
    contains_term, extract_companies, extract_news_keywords, match_configured_keywords,
    score_sentiment, truncate,
};
use crate::cache::{feed_key, CacheError, CacheManager};
use crate::models::{FeedData, NewsArticle};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Window above which undated articles are kept.
const UNDATED_WINDOW_HOURS: u32 = 24;

/// Statistics of one feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedStats {
    pub feed_id: String,
    pub feed_name: String,
    pub total_articles: usize,
    pub articles_24h: usize,
    pub articles_7d: usize,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedStatsBrief {
    pub id: String,
    pub name: String,
    pub articles: usize,
}

/// Statistics over all enabled feeds that could be fetched.
#[derive(Debug, Clone, Serialize)]
pub struct AggregateStats {
    pub total_feeds: usize,
    pub total_articles: usize,
    pub articles_24h: usize,
    pub articles_7d: usize,
    pub feeds: Vec<FeedStatsBrief>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum FeedStatistics {
    Feed(FeedStats),
    All(AggregateStats),
}

/// Outcome of refreshing every enabled feed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshReport {
    pub total_feeds: usize,
    pub successful: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SampleArticle {
    pub title: String,
    pub published: String,
    pub link: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordMatching {
    pub configured_keywords: Vec<String>,
    pub matched_in_sample: Vec<String>,
    pub sample_text_preview: String,
}

/// Connectivity and parsing diagnostics for one feed.
#[derive(Debug, Clone, Serialize)]
pub struct FeedDebugReport {
    pub feed_id: String,
    pub feed_name: String,
    pub feed_url: String,
    pub feed_type: String,
    pub feed_enabled: bool,
    pub feed_keywords: Vec<String>,
    pub connectivity_test: String,
    pub parsing_test: String,
    pub articles_found: usize,
    pub error_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feed_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_entries: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_article: Option<SampleArticle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keyword_matching: Option<KeywordMatching>,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordArticle {
    pub title: String,
    pub published: String,
    pub source: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordMatches {
    pub matches: usize,
    pub articles: Vec<KeywordArticle>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArticleKeywordDetail {
    pub index: usize,
    pub title: String,
    pub published: String,
    pub matched_configured_keywords: Vec<String>,
    pub all_extracted_keywords: Vec<String>,
    pub text_preview: String,
}

/// How a feed's configured keywords match its recent articles.
#[derive(Debug, Clone, Serialize)]
pub struct KeywordAnalysis {
    pub feed_id: String,
    pub feed_name: String,
    pub configured_keywords: Vec<String>,
    pub analysis_period: String,
    pub total_articles: usize,
    pub keyword_analysis: BTreeMap<String, KeywordMatches>,
    pub article_details: Vec<ArticleKeywordDetail>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedArticleDetail {
    pub index: usize,
    pub title: String,
    pub description: String,
    pub published: String,
    pub url: String,
    pub source: String,
    pub keywords_assigned: Vec<String>,
    pub keywords_matched: Vec<String>,
    pub text_preview: String,
}

/// Every article of a freshly fetched feed, regardless of date.
#[derive(Debug, Clone, Serialize)]
pub struct FeedArticlesReport {
    pub feed_id: String,
    pub feed_name: String,
    pub total_articles: usize,
    pub articles_shown: usize,
    pub configured_keywords: Vec<String>,
    pub articles: Vec<FeedArticleDetail>,
}

/// Turn a parsed document into the processed feed for `config`.
pub fn process_feed(config: &FeedConfig, raw: RawFeed, now: DateTime<Utc>) -> FeedData {
    let google = config.is_google_alerts();
    let settings = &config.analysis_settings;
    let alert_query = google
        .then(|| google_alerts::alert_query(&raw.metadata))
        .filter(|q| !q.is_empty());

    let articles: Vec<NewsArticle> = raw
        .entries
        .into_iter()
        .map(|entry| {
            let entry = if google {
                google_alerts::normalize_entry(entry)
            } else {
                clean_standard_entry(entry)
            };

            let description = if entry.description.is_empty() {
                entry.summary
            } else {
                entry.description
            };
            let text = format!("{} {}", entry.title, description);

            NewsArticle {
                id: if entry.id.is_empty() {
                    entry.link.clone()
                } else {
                    entry.id
                },
                keywords: extract_news_keywords(&text, &config.keywords),
                companies: if settings.extracts_companies() {
                    extract_companies(&text)
                } else {
                    Vec::new()
                },
                sentiment: settings
                    .tracks_sentiment()
                    .then(|| score_sentiment(&text)),
                source: if entry.source.is_empty() {
                    raw.metadata.title.clone()
                } else {
                    entry.source
                },
                title: entry.title,
                description,
                url: entry.link,
                published: entry.published,
                feed_id: config.id.clone(),
            }
        })
        .collect();

    FeedData {
        feed_id: config.id.clone(),
        feed_name: config.name.clone(),
        feed_url: config.url.clone(),
        feed_type: config.feed_type,
        metadata: raw.metadata,
        total_articles: articles.len(),
        articles,
        last_updated: now,
        alert_query,
    }
}

fn clean_standard_entry(entry: RawEntry) -> RawEntry {
    RawEntry {
        title: google_alerts::clean_description(&entry.title),
        description: google_alerts::clean_description(&entry.description),
        summary: google_alerts::clean_description(&entry.summary),
        ..entry
    }
}

/// Articles published within `hours` of `now`, newest first.
///
/// Undated or unparseable articles are kept only for windows over 24 hours
/// and sort after every dated article.
pub fn select_recent(articles: &[NewsArticle], hours: u32, now: DateTime<Utc>) -> Vec<NewsArticle> {
    // A window reaching past the earliest representable date has no cutoff
    let cutoff = now.checked_sub_signed(Duration::hours(i64::from(hours)));
    let mut undated = 0;

    let mut recent: Vec<NewsArticle> = articles
        .iter()
        .filter(|article| match article.published_at() {
            Some(published) => cutoff.map_or(true, |cutoff| published >= cutoff),
            None => {
                undated += 1;
                hours > UNDATED_WINDOW_HOURS
            }
        })
        .cloned()
        .collect();

    if undated > 0 {
        debug!("{} articles without a usable date", undated);
    }

    sort_newest_first(&mut recent);
    recent
}

fn sort_newest_first(articles: &mut [NewsArticle]) {
    articles.sort_by_key(|a| std::cmp::Reverse(a.published_at()));
}

/// Case-insensitive substring match on title, description and keywords.
pub fn matches_query(article: &NewsArticle, query: &str) -> bool {
    let query = query.to_lowercase();
    article.title.to_lowercase().contains(&query)
        || article.description.to_lowercase().contains(&query)
        || article
            .keywords
            .iter()
            .any(|k| k.to_lowercase().contains(&query))
}

/// Feed fetching, caching and article queries.
pub struct FeedService {
    registry: RwLock<FeedRegistry>,
    cache: Mutex<CacheManager>,
    fetcher: Arc<dyn FeedFetcher>,
    concurrency: usize,
}

impl FeedService {
    pub fn new(
        registry: FeedRegistry,
        cache: CacheManager,
        fetcher: Arc<dyn FeedFetcher>,
        concurrency: usize,
    ) -> Self {
        Self {
            registry: RwLock::new(registry),
            cache: Mutex::new(cache),
            fetcher,
            concurrency: concurrency.max(1),
        }
    }

    // Registry access

    pub async fn feed_config(&self, feed_id: &str) -> Option<FeedConfig> {
        self.registry.read().await.get(feed_id).cloned()
    }

    pub async fn all_feeds(&self) -> Vec<FeedConfig> {
        self.registry.read().await.all().to_vec()
    }

    pub async fn enabled_feeds(&self) -> Vec<FeedConfig> {
        self.registry.read().await.enabled()
    }

    pub async fn registry_summary(&self) -> RegistrySummary {
        self.registry.read().await.summary()
    }

    pub async fn add_feed(&self, config: FeedConfig) -> Result<(), RegistryError> {
        self.registry.write().await.add(config)
    }

    /// Update a feed. Cached data is dropped since the URL or settings may differ.
    pub async fn update_feed(
        &self,
        feed_id: &str,
        update: FeedUpdate,
    ) -> Result<FeedConfig, RegistryError> {
        let updated = self.registry.write().await.update(feed_id, update)?.clone();
        self.forget_cached(feed_id).await;
        Ok(updated)
    }

    pub async fn remove_feed(&self, feed_id: &str) -> Result<FeedConfig, RegistryError> {
        let removed = self.registry.write().await.remove(feed_id)?;
        self.forget_cached(feed_id).await;
        Ok(removed)
    }

    pub async fn reload_registry(&self) {
        self.registry.write().await.reload();
    }

    async fn forget_cached(&self, feed_id: &str) {
        let key = feed_key(feed_id);
        if let Err(e) = self.with_cache(move |cache| cache.remove(&key)).await {
            warn!("Could not drop cached data for {}: {}", feed_id, e);
        }
    }

    /// Run a cache operation on the blocking pool. The lock is held until it
    /// finishes so read-modify-write cycles do not interleave.
    async fn with_cache<T, F>(&self, op: F) -> Result<T, CacheError>
    where
        F: FnOnce(&CacheManager) -> Result<T, CacheError> + Send + 'static,
        T: Send + 'static,
    {
        let guard = self.cache.lock().await;
        let cache = guard.clone();
        let result = tokio::task::spawn_blocking(move || op(&cache))
            .await
            .map_err(|e| CacheError::Task(e.to_string()))?;
        drop(guard);
        result
    }

    // Fetching

    /// Fetch a feed, from cache unless `force_refresh` is set.
    pub async fn fetch_feed(&self, feed_id: &str, force_refresh: bool) -> Result<FeedData, FeedError> {
        let config = self
            .feed_config(feed_id)
            .await
            .ok_or_else(|| FeedError::NotFound(feed_id.to_string()))?;

        if !config.enabled {
            info!("Feed disabled: {}", feed_id);
            return Err(FeedError::Disabled(feed_id.to_string()));
        }

        let key = feed_key(feed_id);
        if !force_refresh {
            let lookup = key.clone();
            match self.with_cache(move |cache| Ok(cache.get::<FeedData>(&lookup))).await {
                Ok(Some(data)) => {
                    debug!("Using cached data for feed: {}", feed_id);
                    return Ok(data);
                }
                Ok(None) => {}
                Err(e) => warn!("Cache lookup failed for {}: {}", feed_id, e),
            }
        }

        info!("Fetching feed: {} ({})", feed_id, config.url);
        let body = self.fetcher.fetch(&config.url).await?;
        let raw = parse_feed(&body)?;
        let data = process_feed(&config, raw, Utc::now());
        info!("Feed {} has {} articles", feed_id, data.total_articles);

        let entry = data.clone();
        if let Err(e) = self.with_cache(move |cache| cache.put(&key, &entry)).await {
            warn!("Error caching feed data for {}: {}", feed_id, e);
        }

        Ok(data)
    }

    /// Fetch every enabled feed, skipping the ones that fail.
    pub async fn fetch_all_enabled(&self, force_refresh: bool) -> Vec<FeedData> {
        let feeds = self.enabled_feeds().await;
        let results: Vec<_> = stream::iter(feeds)
            .map(|feed| async move {
                let result = self.fetch_feed(&feed.id, force_refresh).await;
                (feed.id, result)
            })
            .buffered(self.concurrency)
            .collect()
            .await;

        results
            .into_iter()
            .filter_map(|(id, result)| match result {
                Ok(data) => Some(data),
                Err(e) => {
                    warn!("Skipping feed {}: {}", id, e);
                    None
                }
            })
            .collect()
    }

    /// Force-refresh every enabled feed.
    pub async fn refresh_all(&self) -> RefreshReport {
        self.refresh_all_with(|_, _| {}).await
    }

    /// Force-refresh every enabled feed, reporting each completion to `on_done`.
    pub async fn refresh_all_with<F>(&self, mut on_done: F) -> RefreshReport
    where
        F: FnMut(&str, Result<&FeedData, &FeedError>),
    {
        let feeds = self.enabled_feeds().await;
        let mut report = RefreshReport {
            total_feeds: feeds.len(),
            ..Default::default()
        };

        let mut results = stream::iter(feeds)
            .map(|feed| async move {
                let result = self.fetch_feed(&feed.id, true).await;
                (feed.id, result)
            })
            .buffer_unordered(self.concurrency);

        while let Some((id, result)) = results.next().await {
            on_done(&id, result.as_ref());
            match result {
                Ok(_) => {
                    report.successful += 1;
                    info!("Refreshed feed: {}", id);
                }
                Err(e) => {
                    report.failed += 1;
                    let message = format!("Error refreshing feed {}: {}", id, e);
                    warn!("{}", message);
                    report.errors.push(message);
                }
            }
        }

        report
    }

    // Article queries

    /// Recent articles of one feed.
    pub async fn recent_articles(&self, feed_id: &str, hours: u32) -> Result<Vec<NewsArticle>, FeedError> {
        let data = self.fetch_feed(feed_id, false).await?;
        let recent = select_recent(&data.articles, hours, Utc::now());
        debug!(
            "Found {} recent articles (within {}h) from {} total in {}",
            recent.len(),
            hours,
            data.articles.len(),
            feed_id
        );
        Ok(recent)
    }

    async fn collect_recent<P>(&self, hours: u32, include: P) -> Vec<NewsArticle>
    where
        P: Fn(&FeedConfig) -> bool,
    {
        let feeds: Vec<FeedConfig> = self
            .enabled_feeds()
            .await
            .into_iter()
            .filter(|f| include(f))
            .collect();

        let mut articles = Vec::new();
        for feed in feeds {
            match self.recent_articles(&feed.id, hours).await {
                Ok(recent) => articles.extend(recent),
                Err(e) => warn!("Skipping feed {}: {}", feed.id, e),
            }
        }

        sort_newest_first(&mut articles);
        articles
    }

    /// Recent articles of every enabled feed.
    pub async fn all_recent_articles(&self, hours: u32) -> Vec<NewsArticle> {
        self.collect_recent(hours, |_| true).await
    }

    /// Recent articles of the enabled feeds that take part in trend detection.
    pub async fn trend_articles(&self, hours: u32) -> Vec<NewsArticle> {
        self.collect_recent(hours, |f| f.analysis_settings.detects_trends())
            .await
    }

    /// Search recent articles of one feed or of all enabled feeds.
    pub async fn search_articles(
        &self,
        query: &str,
        feed_id: Option<&str>,
        hours: u32,
    ) -> Result<Vec<NewsArticle>, FeedError> {
        let articles = match feed_id {
            Some(id) => self.recent_articles(id, hours).await?,
            None => self.all_recent_articles(hours).await,
        };

        Ok(articles
            .into_iter()
            .filter(|a| matches_query(a, query))
            .collect())
    }

    /// Statistics for one feed, or for all enabled feeds.
    pub async fn feed_statistics(&self, feed_id: Option<&str>) -> Result<FeedStatistics, FeedError> {
        let now = Utc::now();

        if let Some(id) = feed_id {
            let data = self.fetch_feed(id, false).await?;
            return Ok(FeedStatistics::Feed(FeedStats {
                feed_id: data.feed_id.clone(),
                feed_name: data.feed_name.clone(),
                total_articles: data.total_articles,
                articles_24h: select_recent(&data.articles, 24, now).len(),
                articles_7d: select_recent(&data.articles, 168, now).len(),
                last_updated: data.last_updated,
            }));
        }

        let feeds = self.fetch_all_enabled(false).await;
        Ok(FeedStatistics::All(AggregateStats {
            total_feeds: feeds.len(),
            total_articles: feeds.iter().map(|f| f.total_articles).sum(),
            articles_24h: feeds
                .iter()
                .map(|f| select_recent(&f.articles, 24, now).len())
                .sum(),
            articles_7d: feeds
                .iter()
                .map(|f| select_recent(&f.articles, 168, now).len())
                .sum(),
            feeds: feeds
                .iter()
                .map(|f| FeedStatsBrief {
                    id: f.feed_id.clone(),
                    name: f.feed_name.clone(),
                    articles: f.total_articles,
                })
                .collect(),
        }))
    }

    // Diagnostics

    /// Test connectivity and parsing of a feed, bypassing the cache.
    ///
    /// Only an unknown feed id is an error; every other failure is
    /// reported inside the returned report.
    pub async fn debug_feed(&self, feed_id: &str) -> Result<FeedDebugReport, FeedError> {
        let config = self
            .feed_config(feed_id)
            .await
            .ok_or_else(|| FeedError::NotFound(feed_id.to_string()))?;

        let mut report = FeedDebugReport {
            feed_id: config.id.clone(),
            feed_name: config.name.clone(),
            feed_url: config.url.clone(),
            feed_type: config.feed_type.to_string(),
            feed_enabled: config.enabled,
            feed_keywords: config.keywords.clone(),
            connectivity_test: "pending".to_string(),
            parsing_test: "pending".to_string(),
            articles_found: 0,
            error_details: None,
            feed_title: None,
            feed_description: None,
            alert_query: None,
            total_entries: None,
            sample_article: None,
            keyword_matching: None,
        };

        let body = match self.fetcher.fetch(&config.url).await {
            Ok(body) => {
                report.connectivity_test = "success".to_string();
                body
            }
            Err(e) => {
                report.connectivity_test = "failed".to_string();
                report.error_details = Some(e.to_string());
                return Ok(report);
            }
        };

        let raw = match parse_feed(&body) {
            Ok(raw) => raw,
            Err(e) => {
                report.parsing_test = format!("failed - {}", e);
                report.error_details = Some(e.to_string());
                return Ok(report);
            }
        };

        report.feed_title = Some(raw.metadata.title.clone());
        report.feed_description = Some(raw.metadata.description.clone());
        if config.is_google_alerts() {
            report.alert_query = Some(google_alerts::alert_query(&raw.metadata))
                .filter(|q| !q.is_empty());
        }
        report.total_entries = Some(raw.entries.len());

        let Some(first) = raw.entries.first() else {
            report.parsing_test = "failed - no entries found".to_string();
            return Ok(report);
        };

        report.parsing_test = "success".to_string();
        report.articles_found = raw.entries.len();

        let sample = SampleArticle {
            title: first.title.clone(),
            published: if first.published.is_empty() {
                "No date".to_string()
            } else {
                first.published.clone()
            },
            link: first.link.clone(),
            description: first.description.chars().take(200).collect(),
        };
        let sample_text = format!("{} {}", sample.title, sample.description);
        report.keyword_matching = Some(KeywordMatching {
            configured_keywords: config.keywords.clone(),
            matched_in_sample: match_configured_keywords(&sample_text, &config.keywords),
            sample_text_preview: sample_text.chars().take(300).collect(),
        });
        report.sample_article = Some(sample);

        Ok(report)
    }

    /// Match a feed's configured keywords against its recent articles.
    pub async fn keyword_analysis(&self, feed_id: &str, hours: u32) -> Result<KeywordAnalysis, FeedError> {
        let config = self
            .feed_config(feed_id)
            .await
            .ok_or_else(|| FeedError::NotFound(feed_id.to_string()))?;
        let articles = self.recent_articles(feed_id, hours).await?;

        let keyword_analysis = config
            .keywords
            .iter()
            .map(|keyword| {
                let matching: Vec<KeywordArticle> = articles
                    .iter()
                    .filter(|a| contains_term(&a.text(), keyword))
                    .map(|a| KeywordArticle {
                        title: a.title.clone(),
                        published: a.published.clone(),
                        source: a.source.clone(),
                        url: a.url.clone(),
                    })
                    .collect();
                (
                    keyword.clone(),
                    KeywordMatches {
                        matches: matching.len(),
                        articles: matching,
                    },
                )
            })
            .collect();

        let article_details = articles
            .iter()
            .take(10)
            .enumerate()
            .map(|(i, article)| {
                let text = article.text();
                ArticleKeywordDetail {
                    index: i + 1,
                    title: article.title.clone(),
                    published: article.published.clone(),
                    matched_configured_keywords: match_configured_keywords(&text, &config.keywords),
                    all_extracted_keywords: extract_news_keywords(&text, &[]),
                    text_preview: truncate(&text, 300),
                }
            })
            .collect();

        Ok(KeywordAnalysis {
            feed_id: config.id,
            feed_name: config.name,
            configured_keywords: config.keywords,
            analysis_period: format!("{} hours", hours),
            total_articles: articles.len(),
            keyword_analysis,
            article_details,
        })
    }

    /// Force-refresh a feed and list its articles regardless of date.
    pub async fn all_feed_articles(&self, feed_id: &str, limit: usize) -> Result<FeedArticlesReport, FeedError> {
        let data = self.fetch_feed(feed_id, true).await?;
        let keywords = self
            .feed_config(feed_id)
            .await
            .map(|c| c.keywords)
            .unwrap_or_default();

        let articles = data
            .articles
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, article)| {
                let text = article.text();
                FeedArticleDetail {
                    index: i + 1,
                    title: article.title.clone(),
                    description: truncate(&article.description, 200),
                    published: article.published.clone(),
                    url: article.url.clone(),
                    source: article.source.clone(),
                    keywords_assigned: article.keywords.clone(),
                    keywords_matched: match_configured_keywords(&text, &keywords),
                    text_preview: truncate(&text, 300),
                }
            })
            .collect::<Vec<_>>();

        Ok(FeedArticlesReport {
            feed_id: data.feed_id.clone(),
            feed_name: data.feed_name.clone(),
            total_articles: data.articles.len(),
            articles_shown: articles.len(),
            configured_keywords: keywords,
            articles,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feeds::testing::{feed, rss_document, FakeFetcher, TestEnv};
    use crate::feeds::{AnalysisSettings, FeedType};
    use crate::models::Sentiment;

    const TC: &str = "https://tc.example.com/rss";
    const HN: &str = "https://hn.example.com/rss";

    fn article(published: &str) -> NewsArticle {
        NewsArticle {
            id: published.to_string(),
            title: "t".to_string(),
            description: String::new(),
            url: String::new(),
            published: published.to_string(),
            source: "s".to_string(),
            feed_id: "f".to_string(),
            keywords: vec![],
            sentiment: None,
            companies: vec![],
        }
    }

    #[test]
    fn test_select_recent_windows() {
        let now = Utc::now();
        let fresh = article(&(now - Duration::hours(2)).to_rfc3339());
        let old = article(&(now - Duration::hours(30)).to_rfc2822());
        let undated = article("");
        let garbage = article("sometime last week");
        let all = vec![old.clone(), undated.clone(), fresh.clone(), garbage];

        let day = select_recent(&all, 24, now);
        assert_eq!(day, vec![fresh.clone()]);

        let two_days = select_recent(&all, 48, now);
        assert_eq!(two_days.len(), 4);
        assert_eq!(two_days[0], fresh);
        assert_eq!(two_days[1], old);
        assert!(two_days[2].published_at().is_none());
    }

    #[test]
    fn test_select_recent_huge_window() {
        let now = Utc::now();
        let ancient = article("Mon, 01 Jan 1990 00:00:00 +0000");
        let undated = article("");

        let all = select_recent(&[ancient.clone(), undated], u32::MAX, now);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0], ancient);
    }

    #[test]
    fn test_matches_query() {
        let mut a = article("");
        a.title = "OpenAI ships GPT".to_string();
        a.keywords = vec!["machine learning".to_string()];

        assert!(matches_query(&a, "openai"));
        assert!(matches_query(&a, "LEARNING"));
        assert!(!matches_query(&a, "blockchain"));
    }

    #[test]
    fn test_process_standard_feed() {
        let mut config = feed("tc", TC, &["agent platform"]);
        config.analysis_settings.track_sentiment = Some(false);
        let raw = parse_feed(include_str!("../../fixtures/rss2.xml")).unwrap();

        let data = process_feed(&config, raw, Utc::now());
        assert_eq!(data.total_articles, 3);
        assert_eq!(data.feed_type, FeedType::StandardRss);
        assert!(data.alert_query.is_none());

        let first = &data.articles[0];
        assert_eq!(first.id, "techdaily-1001");
        assert_eq!(first.source, "Tech Daily");
        assert_eq!(first.description, "The AI lab launched tools for building AI agents.");
        assert!(first.keywords.contains(&"agent platform".to_string()));
        assert!(first.keywords.contains(&"ai agents".to_string()));
        assert_eq!(first.companies, vec!["OpenAI"]);
        assert!(first.sentiment.is_none());

        // No guid: the link is the id
        assert_eq!(data.articles[2].id, "https://techdaily.example.com/chips");
        assert_eq!(data.articles[2].companies, vec!["AMD", "Nvidia"]);
    }

    #[test]
    fn test_process_google_alerts_feed() {
        let mut config = feed(
            "alerts",
            "https://www.google.com/alerts/feeds/01516800834195557068/15279974359414489902",
            &["AI"],
        );
        config.analysis_settings = AnalysisSettings {
            track_sentiment: Some(true),
            ..Default::default()
        };
        let raw = parse_feed(include_str!("../../fixtures/google_alerts.xml")).unwrap();

        let data = process_feed(&config, raw, Utc::now());
        let first = &data.articles[0];
        assert_eq!(first.source, "Reuters");
        assert_eq!(first.url, "https://www.reuters.com/tech/microsoft-ai?ref=alert");
        assert!(first.companies.is_empty());
        assert_eq!(first.sentiment, Some(Sentiment::Neutral));

        // No publisher in the title: fall back to the feed title
        assert_eq!(data.articles[1].source, "Google Alert - artificial intelligence");
        assert_eq!(data.alert_query.as_deref(), Some("artificial intelligence"));
    }

    #[tokio::test]
    async fn test_debug_google_alerts_feed() {
        let url = "https://www.google.com/alerts/feeds/015/152";
        let fetcher = FakeFetcher::default()
            .with(url, include_str!("../../fixtures/google_alerts.xml").to_string());
        let env = TestEnv::new(vec![feed("alerts", url, &[])], fetcher);

        let report = env.service.debug_feed("alerts").await.unwrap();
        assert_eq!(report.parsing_test, "success");
        assert_eq!(report.alert_query.as_deref(), Some("artificial intelligence"));

        let data = env.service.fetch_feed("alerts", false).await.unwrap();
        assert_eq!(data.alert_query.as_deref(), Some("artificial intelligence"));
    }

    #[tokio::test]
    async fn test_fetch_feed_uses_cache() {
        let fetcher = FakeFetcher::default().with(TC, rss_document("TC", &[("AI news", "", 1)]));
        let env = TestEnv::new(vec![feed("tc", TC, &[])], fetcher);

        let first = env.service.fetch_feed("tc", false).await.unwrap();
        let second = env.service.fetch_feed("tc", false).await.unwrap();
        assert_eq!(first.articles, second.articles);
        assert_eq!(env.fetcher.calls(), 1);

        env.service.fetch_feed("tc", true).await.unwrap();
        assert_eq!(env.fetcher.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_fetches_share_one_cache_file() {
        let fetcher = FakeFetcher::default()
            .with(TC, rss_document("TC", &[("AI news", "", 1)]))
            .with(HN, rss_document("HN", &[("Rust release", "", 2)]));
        let env = TestEnv::new(vec![feed("tc", TC, &[]), feed("hn", HN, &[])], fetcher);

        let (tc, hn) = tokio::join!(
            env.service.fetch_feed("tc", false),
            env.service.fetch_feed("hn", false)
        );
        tc.unwrap();
        hn.unwrap();

        let raw = std::fs::read_to_string(env.dir.path().join("cache.json")).unwrap();
        assert!(raw.contains("feed_tc"));
        assert!(raw.contains("feed_hn"));

        env.service.remove_feed("tc").await.unwrap();
        let raw = std::fs::read_to_string(env.dir.path().join("cache.json")).unwrap();
        assert!(!raw.contains("feed_tc"));
        assert!(raw.contains("feed_hn"));
    }

    #[tokio::test]
    async fn test_fetch_feed_errors() {
        let mut disabled = feed("off", HN, &[]);
        disabled.enabled = false;
        let env = TestEnv::new(vec![disabled, feed("down", TC, &[])], FakeFetcher::default());

        assert!(matches!(
            env.service.fetch_feed("missing", false).await,
            Err(FeedError::NotFound(_))
        ));
        assert!(matches!(
            env.service.fetch_feed("off", false).await,
            Err(FeedError::Disabled(_))
        ));
        assert!(matches!(
            env.service.fetch_feed("down", false).await,
            Err(FeedError::Connect { .. })
        ));
    }

    #[tokio::test]
    async fn test_all_recent_articles_skips_failing_feeds() {
        let fetcher = FakeFetcher::default()
            .with(TC, rss_document("TC", &[("Older", "", 5), ("Newest", "", 1)]))
            .with(HN, "<html>not a feed</html>".to_string());
        let env = TestEnv::new(vec![feed("tc", TC, &[]), feed("hn", HN, &[])], fetcher);

        let articles = env.service.all_recent_articles(24).await;
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Newest", "Older"]);
    }

    #[tokio::test]
    async fn test_trend_articles_respect_toggle() {
        let fetcher = FakeFetcher::default()
            .with(TC, rss_document("TC", &[("AI in TC", "", 1)]))
            .with(HN, rss_document("HN", &[("AI in HN", "", 1)]));
        let mut quiet = feed("hn", HN, &[]);
        quiet.analysis_settings.detect_trends = Some(false);
        let env = TestEnv::new(vec![feed("tc", TC, &[]), quiet], fetcher);

        assert_eq!(env.service.all_recent_articles(24).await.len(), 2);
        let trend = env.service.trend_articles(24).await;
        assert_eq!(trend.len(), 1);
        assert_eq!(trend[0].feed_id, "tc");
    }

    #[tokio::test]
    async fn test_search_articles() {
        let fetcher = FakeFetcher::default().with(
            TC,
            rss_document(
                "TC",
                &[
                    ("Startup raises seed", "Funding news", 2),
                    ("Weather", "Rain again", 3),
                    ("Old funding story", "", 300),
                ],
            ),
        );
        let env = TestEnv::new(vec![feed("tc", TC, &[])], fetcher);

        let hits = env.service.search_articles("FUNDING", None, 168).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Startup raises seed");

        let by_feed = env
            .service
            .search_articles("rain", Some("tc"), 168)
            .await
            .unwrap();
        assert_eq!(by_feed.len(), 1);

        assert!(env
            .service
            .search_articles("rain", Some("nope"), 168)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_feed_statistics() {
        let fetcher = FakeFetcher::default().with(
            TC,
            rss_document("TC", &[("a", "", 1), ("b", "", 48), ("c", "", 500)]),
        );
        let env = TestEnv::new(vec![feed("tc", TC, &[]), feed("hn", HN, &[])], fetcher);

        match env.service.feed_statistics(Some("tc")).await.unwrap() {
            FeedStatistics::Feed(stats) => {
                assert_eq!(stats.total_articles, 3);
                assert_eq!(stats.articles_24h, 1);
                assert_eq!(stats.articles_7d, 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        match env.service.feed_statistics(None).await.unwrap() {
            FeedStatistics::All(stats) => {
                // hn cannot be fetched and is left out
                assert_eq!(stats.total_feeds, 1);
                assert_eq!(stats.total_articles, 3);
                assert_eq!(stats.feeds[0].id, "tc");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_refresh_all_reports_failures() {
        let fetcher = FakeFetcher::default().with(TC, rss_document("TC", &[("a", "", 1)]));
        let env = TestEnv::new(vec![feed("tc", TC, &[]), feed("hn", HN, &[])], fetcher);

        let mut seen = Vec::new();
        let report = env
            .service
            .refresh_all_with(|id, result| seen.push((id.to_string(), result.is_ok())))
            .await;

        assert_eq!(report.total_feeds, 2);
        assert_eq!(report.successful, 1);
        assert_eq!(report.failed, 1);
        assert!(report.errors[0].contains("hn"));
        seen.sort();
        assert_eq!(seen, vec![("hn".to_string(), false), ("tc".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_debug_feed() {
        let fetcher = FakeFetcher::default()
            .with(TC, rss_document("TC", &[("Machine learning at scale", "", -1)]))
            .with(HN, "<rss version=\"2.0\"><channel><title>Empty</title></channel></rss>".to_string());
        let env = TestEnv::new(
            vec![
                feed("tc", TC, &["machine learning", "quantum"]),
                feed("hn", HN, &[]),
                feed("down", "https://down.example.com/rss", &[]),
            ],
            fetcher,
        );

        let ok = env.service.debug_feed("tc").await.unwrap();
        assert_eq!(ok.connectivity_test, "success");
        assert_eq!(ok.parsing_test, "success");
        assert_eq!(ok.articles_found, 1);
        assert_eq!(ok.sample_article.as_ref().unwrap().published, "No date");
        assert_eq!(
            ok.keyword_matching.unwrap().matched_in_sample,
            vec!["machine learning"]
        );

        let empty = env.service.debug_feed("hn").await.unwrap();
        assert_eq!(empty.parsing_test, "failed - no entries found");
        assert_eq!(empty.feed_title.as_deref(), Some("Empty"));

        let down = env.service.debug_feed("down").await.unwrap();
        assert_eq!(down.connectivity_test, "failed");
        assert!(down.error_details.is_some());

        assert!(env.service.debug_feed("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_keyword_analysis_and_all_articles() {
        let fetcher = FakeFetcher::default().with(
            TC,
            rss_document(
                "TC",
                &[("AI chips", "Nvidia results", 1), ("Gardening", "", 400)],
            ),
        );
        let env = TestEnv::new(vec![feed("tc", TC, &["AI", "robotics"])], fetcher);

        let analysis = env.service.keyword_analysis("tc", 168).await.unwrap();
        assert_eq!(analysis.total_articles, 1);
        assert_eq!(analysis.keyword_analysis["AI"].matches, 1);
        assert_eq!(analysis.keyword_analysis["robotics"].matches, 0);
        assert_eq!(analysis.article_details[0].matched_configured_keywords, vec!["AI"]);

        let all = env.service.all_feed_articles("tc", 1).await.unwrap();
        assert_eq!(all.total_articles, 2);
        assert_eq!(all.articles_shown, 1);
        assert_eq!(all.articles[0].keywords_matched, vec!["AI"]);
    }

    #[tokio::test]
    async fn test_registry_changes_drop_cache() {
        let fetcher = FakeFetcher::default().with(TC, rss_document("TC", &[("a", "", 1)]));
        let env = TestEnv::new(vec![feed("tc", TC, &[])], fetcher);

        env.service.fetch_feed("tc", false).await.unwrap();
        let update = FeedUpdate {
            keywords: Some(vec!["ai".to_string()]),
            ..Default::default()
        };
        env.service.update_feed("tc", update).await.unwrap();
        env.service.fetch_feed("tc", false).await.unwrap();
        assert_eq!(env.fetcher.calls(), 2);

        env.service.remove_feed("tc").await.unwrap();
        assert!(env.service.feed_config("tc").await.is_none());
    }
}
