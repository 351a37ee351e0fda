//! MCP tools for feed monitoring and news analysis.
//!
//! This module defines the tools exposed to the MCP host and the executor
//! that dispatches tool calls to the feed service and the analyzer. Every
//! tool answers with a JSON document.

use crate::analysis::{truncate, NewsAnalyzer};
use crate::feeds::service::FeedStatistics;
use crate::feeds::{FeedConfig, FeedError, FeedService, FeedUpdate, RegistryError};
use crate::llm::NarrativeWriter;
use crate::models::{ArticleRef, NewsArticle};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Articles listed by `fetch_rss_feed`.
const FETCH_ARTICLE_LIMIT: usize = 20;
/// Description length in article listings.
const DESCRIPTION_CHARS: usize = 200;
const TREND_LIMIT: usize = 10;
const TREND_SAMPLE_ARTICLES: usize = 3;
const SPIKE_LIMIT: usize = 10;
const SEARCH_LIMIT: usize = 20;
const KEYWORD_LIMIT: u32 = 20;

/// Tool definition as listed by `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Result of executing a tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResult {
    pub success: bool,
    /// Pretty-printed JSON document.
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    pub fn success(output: String) -> Self {
        Self {
            success: true,
            output,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self::error_with(message, None)
    }

    /// Failure whose JSON body carries extra details next to the message.
    pub fn error_with(message: String, details: Option<Value>) -> Self {
        let mut body = Map::new();
        body.insert("error".to_string(), Value::String(message.clone()));
        if let Some(details) = details {
            body.insert("debug_info".to_string(), details);
        }
        Self {
            success: false,
            output: pretty(&Value::Object(body)),
            error: Some(message),
        }
    }
}

/// Errors raised while running a tool.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Feed configuration not found: {0}")]
    FeedNotConfigured(String),

    #[error("Feed not found or failed to fetch: {feed_id} ({source})")]
    FetchFailed {
        feed_id: String,
        #[source]
        source: FeedError,
        debug_info: Option<Value>,
    },

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("Failed to serialize tool output: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ToolError {
    fn into_result(self) -> ToolResult {
        let message = self.to_string();
        match self {
            ToolError::FetchFailed { debug_info, .. } => ToolResult::error_with(message, debug_info),
            _ => ToolResult::error(message),
        }
    }
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn no_args() -> Value {
    json!({"type": "object", "properties": {}})
}

fn hours_prop(default: u32) -> Value {
    json!({
        "type": "integer",
        "description": format!("Number of hours to look back (default: {})", default),
        "minimum": 1,
        "default": default
    })
}

fn feed_id_prop(description: &str) -> Value {
    json!({"type": "string", "description": description})
}

/// JSON schema of the editable feed fields.
fn feed_fields(required: &[&str], with_id: bool) -> Value {
    let mut properties = json!({
        "name": {"type": "string", "description": "Human readable feed name"},
        "url": {"type": "string", "description": "Feed URL (http:// or https://)"},
        "type": {
            "type": "string",
            "enum": ["google_alerts", "standard_rss", "atom", "custom"],
            "description": "Feed type (default: standard_rss)"
        },
        "keywords": {
            "type": "array",
            "items": {"type": "string"},
            "description": "Keywords to track in this feed"
        },
        "update_frequency": {
            "type": "string",
            "enum": ["1h", "6h", "12h", "24h"],
            "description": "Expected update frequency (default: 1h)"
        },
        "enabled": {"type": "boolean", "description": "Whether the feed is monitored"},
        "analysis_settings": {
            "type": "object",
            "description": "Analysis toggles: track_sentiment, extract_companies, detect_trends"
        }
    });
    if with_id {
        properties["id"] = json!({"type": "string", "description": "Unique feed ID"});
    } else {
        properties["feed_id"] = feed_id_prop("ID of the feed to update");
    }
    json!({"type": "object", "properties": properties, "required": required})
}

/// Definitions of every tool the server exposes.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        tool(
            "configure_rss_feeds",
            "Show the feed configuration: registry summary, configured feeds and how to manage them.",
            no_args(),
        ),
        tool(
            "get_rss_feeds",
            "List configured RSS/Atom feeds.",
            json!({
                "type": "object",
                "properties": {
                    "enabled_only": {
                        "type": "boolean",
                        "description": "Only list enabled feeds (default: true)",
                        "default": true
                    }
                }
            }),
        ),
        tool(
            "add_rss_feed",
            "Add a feed to the registry.",
            feed_fields(&["id", "name", "url"], true),
        ),
        tool(
            "update_rss_feed",
            "Update fields of a configured feed. The feed ID cannot change.",
            feed_fields(&["feed_id"], false),
        ),
        tool(
            "remove_rss_feed",
            "Remove a feed from the registry.",
            json!({
                "type": "object",
                "properties": {"feed_id": feed_id_prop("ID of the feed to remove")},
                "required": ["feed_id"]
            }),
        ),
        tool(
            "fetch_rss_feed",
            "Fetch and parse a specific feed, returning its most recent articles.",
            json!({
                "type": "object",
                "properties": {
                    "feed_id": feed_id_prop("ID of the feed to fetch"),
                    "force_refresh": {
                        "type": "boolean",
                        "description": "Bypass the cache (default: false)",
                        "default": false
                    },
                    "debug": {
                        "type": "boolean",
                        "description": "Include feed configuration details on failure (default: false)",
                        "default": false
                    }
                },
                "required": ["feed_id"]
            }),
        ),
        tool(
            "refresh_all_feeds",
            "Refresh every enabled feed, bypassing the cache.",
            no_args(),
        ),
        tool(
            "analyze_news_trends",
            "Find trending topics across all feeds.",
            json!({
                "type": "object",
                "properties": {
                    "hours": hours_prop(24),
                    "min_mentions": {
                        "type": "integer",
                        "description": "Minimum mentions for a topic to count as trending (default: 3)",
                        "minimum": 1,
                        "default": 3
                    }
                }
            }),
        ),
        tool(
            "get_trending_keywords",
            "Rank keywords by how often recent articles mention them.",
            json!({
                "type": "object",
                "properties": {
                    "hours": hours_prop(24),
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of keywords (default: 20)",
                        "minimum": 1,
                        "default": KEYWORD_LIMIT
                    }
                }
            }),
        ),
        tool(
            "detect_news_spikes",
            "Detect topics whose coverage rate jumped compared to a longer window.",
            json!({
                "type": "object",
                "properties": {
                    "hours": hours_prop(24),
                    "comparison_hours": {
                        "type": "integer",
                        "description": "Historical window to compare against (default: 168)",
                        "minimum": 1,
                        "default": 168
                    }
                }
            }),
        ),
        tool(
            "get_news_summary",
            "Summarize recent news: volume, sources, trends, companies and spikes.",
            json!({"type": "object", "properties": {"hours": hours_prop(24)}}),
        ),
        tool(
            "suggest_timely_topics",
            "Suggest timely content topics from trends, spikes and company news.",
            json!({"type": "object", "properties": {"hours": hours_prop(24)}}),
        ),
        tool(
            "search_news_articles",
            "Search recent articles by title, description or keyword.",
            json!({
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Text to search for"},
                    "feed_id": feed_id_prop("Limit the search to one feed (default: all feeds)"),
                    "hours": hours_prop(168)
                },
                "required": ["query"]
            }),
        ),
        tool(
            "get_company_mentions",
            "Count company mentions in recent articles.",
            json!({"type": "object", "properties": {"hours": hours_prop(24)}}),
        ),
        tool(
            "get_feed_statistics",
            "Article statistics for one feed, or for all enabled feeds.",
            json!({
                "type": "object",
                "properties": {
                    "feed_id": feed_id_prop("Feed to report on (default: all feeds)")
                }
            }),
        ),
        tool(
            "debug_rss_feed",
            "Diagnose connectivity, parsing and keyword matching of a feed.",
            json!({
                "type": "object",
                "properties": {"feed_id": feed_id_prop("ID of the feed to debug")},
                "required": ["feed_id"]
            }),
        ),
        tool(
            "analyze_feed_keywords",
            "Show how a feed's configured keywords match its recent articles.",
            json!({
                "type": "object",
                "properties": {
                    "feed_id": feed_id_prop("ID of the feed to analyze"),
                    "hours": hours_prop(168)
                },
                "required": ["feed_id"]
            }),
        ),
        tool(
            "get_all_feed_articles",
            "List a feed's articles regardless of date, with keyword details.",
            json!({
                "type": "object",
                "properties": {
                    "feed_id": feed_id_prop("ID of the feed"),
                    "limit": {
                        "type": "integer",
                        "description": "Maximum number of articles (default: 20)",
                        "minimum": 1,
                        "default": 20
                    }
                },
                "required": ["feed_id"]
            }),
        ),
    ]
}

// Argument helpers

fn req_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| ToolError::InvalidArgument(format!("Missing required parameter: {}", key)))
}

fn opt_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(_) => Err(ToolError::InvalidArgument(format!("'{}' must be a string", key))),
    }
}

fn opt_bool(args: &Value, key: &str, default: bool) -> Result<bool, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(ToolError::InvalidArgument(format!("'{}' must be a boolean", key))),
    }
}

/// Positive integer argument.
fn opt_u32(args: &Value, key: &str, default: u32) -> Result<u32, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v
            .as_u64()
            .filter(|n| *n > 0)
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| {
                ToolError::InvalidArgument(format!("'{}' must be a positive integer", key))
            }),
    }
}

fn article_listing(article: &NewsArticle) -> Value {
    json!({
        "id": article.id,
        "title": article.title,
        "description": truncate(&article.description, DESCRIPTION_CHARS),
        "url": article.url,
        "published": article.published,
        "source": article.source,
        "keywords": article.keywords,
        "companies": article.companies,
    })
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Executes tool calls against the feed service and analyzer.
pub struct ToolExecutor {
    service: Arc<FeedService>,
    analyzer: NewsAnalyzer,
    narrator: Option<NarrativeWriter>,
}

impl ToolExecutor {
    pub fn new(service: Arc<FeedService>, narrator: Option<NarrativeWriter>) -> Self {
        let analyzer = NewsAnalyzer::new(Arc::clone(&service));
        Self {
            service,
            analyzer,
            narrator,
        }
    }

    /// Whether `name` is a known tool.
    pub fn has_tool(&self, name: &str) -> bool {
        get_tool_definitions().iter().any(|t| t.name == name)
    }

    /// Execute a tool call and return the result.
    pub async fn execute(&self, name: &str, args: &Value) -> ToolResult {
        debug!("Executing tool: {} with args: {}", name, args);

        let result = match name {
            "configure_rss_feeds" => self.configure_rss_feeds().await,
            "get_rss_feeds" => self.get_rss_feeds(args).await,
            "add_rss_feed" => self.add_rss_feed(args).await,
            "update_rss_feed" => self.update_rss_feed(args).await,
            "remove_rss_feed" => self.remove_rss_feed(args).await,
            "fetch_rss_feed" => self.fetch_rss_feed(args).await,
            "refresh_all_feeds" => self.refresh_all_feeds().await,
            "analyze_news_trends" => self.analyze_news_trends(args).await,
            "get_trending_keywords" => self.get_trending_keywords(args).await,
            "detect_news_spikes" => self.detect_news_spikes(args).await,
            "get_news_summary" => self.get_news_summary(args).await,
            "suggest_timely_topics" => self.suggest_timely_topics(args).await,
            "search_news_articles" => self.search_news_articles(args).await,
            "get_company_mentions" => self.get_company_mentions(args).await,
            "get_feed_statistics" => self.get_feed_statistics(args).await,
            "debug_rss_feed" => self.debug_rss_feed(args).await,
            "analyze_feed_keywords" => self.analyze_feed_keywords(args).await,
            "get_all_feed_articles" => self.get_all_feed_articles(args).await,
            _ => Err(ToolError::UnknownTool(name.to_string())),
        };

        match result {
            Ok(value) => ToolResult::success(pretty(&value)),
            Err(e) => {
                warn!("Tool {} failed: {}", name, e);
                e.into_result()
            }
        }
    }

    async fn configure_rss_feeds(&self) -> Result<Value, ToolError> {
        let summary = self.service.registry_summary().await;
        let feeds: Vec<Value> = self
            .service
            .all_feeds()
            .await
            .iter()
            .map(|f| {
                json!({
                    "id": f.id,
                    "name": f.name,
                    "url": f.url,
                    "type": f.feed_type,
                    "enabled": f.enabled,
                    "update_frequency": f.update_frequency,
                    "keywords": f.keywords,
                })
            })
            .collect();

        Ok(json!({
            "config_summary": summary,
            "feeds": feeds,
            "management_instructions": {
                "add_feed": "Use the add_rss_feed tool, or edit the registry file",
                "update_feed": "Use the update_rss_feed tool to change name, url, type, keywords, frequency or settings",
                "enable_disable": "Use update_rss_feed with 'enabled' set to true or false",
                "remove_feed": "Use the remove_rss_feed tool",
                "config_file_location": summary.config_file,
            }
        }))
    }

    async fn get_rss_feeds(&self, args: &Value) -> Result<Value, ToolError> {
        let enabled_only = opt_bool(args, "enabled_only", true)?;
        let feeds = if enabled_only {
            self.service.enabled_feeds().await
        } else {
            self.service.all_feeds().await
        };

        Ok(json!({
            "total_feeds": feeds.len(),
            "enabled_only": enabled_only,
            "feeds": feeds,
        }))
    }

    async fn add_rss_feed(&self, args: &Value) -> Result<Value, ToolError> {
        let config: FeedConfig = serde_json::from_value(args.clone())
            .map_err(|e| ToolError::InvalidArgument(e.to_string()))?;
        let feed_id = config.id.clone();
        self.service.add_feed(config).await?;
        let feed = self
            .service
            .feed_config(&feed_id)
            .await
            .ok_or_else(|| ToolError::FeedNotConfigured(feed_id.clone()))?;

        Ok(json!({"status": "added", "feed": feed}))
    }

    async fn update_rss_feed(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = req_str(args, "feed_id")?.to_string();
        let mut fields = args.as_object().cloned().unwrap_or_default();
        fields.remove("feed_id");

        let update: FeedUpdate = serde_json::from_value(Value::Object(fields))
            .map_err(|e| ToolError::InvalidArgument(e.to_string()))?;
        if update.is_empty() {
            return Err(ToolError::InvalidArgument("No fields to update".to_string()));
        }

        let feed = self.service.update_feed(&feed_id, update).await?;
        Ok(json!({"status": "updated", "feed": feed}))
    }

    async fn remove_rss_feed(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = req_str(args, "feed_id")?;
        let removed = self.service.remove_feed(feed_id).await?;
        Ok(json!({"status": "removed", "feed_id": removed.id, "name": removed.name}))
    }

    async fn fetch_rss_feed(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = req_str(args, "feed_id")?;
        let force_refresh = opt_bool(args, "force_refresh", false)?;
        let debug = opt_bool(args, "debug", false)?;

        let config = self
            .service
            .feed_config(feed_id)
            .await
            .ok_or_else(|| ToolError::FeedNotConfigured(feed_id.to_string()))?;

        let data = match self.service.fetch_feed(feed_id, force_refresh).await {
            Ok(data) => data,
            Err(source) => {
                let debug_info = debug.then(|| {
                    json!({
                        "feed_id": config.id,
                        "feed_url": config.url,
                        "feed_enabled": config.enabled,
                        "feed_type": config.feed_type,
                    })
                });
                return Err(ToolError::FetchFailed {
                    feed_id: feed_id.to_string(),
                    source,
                    debug_info,
                });
            }
        };

        let articles: Vec<Value> = data
            .articles
            .iter()
            .take(FETCH_ARTICLE_LIMIT)
            .map(article_listing)
            .collect();

        Ok(json!({
            "feed_id": data.feed_id,
            "feed_name": data.feed_name,
            "feed_type": data.feed_type,
            "total_articles": data.total_articles,
            "articles_shown": articles.len(),
            "last_updated": data.last_updated,
            "alert_query": data.alert_query,
            "articles": articles,
        }))
    }

    /// Hand edits to the registry file take effect on refresh.
    async fn refresh_all_feeds(&self) -> Result<Value, ToolError> {
        self.service.reload_registry().await;
        let report = self.service.refresh_all().await;
        Ok(serde_json::to_value(report)?)
    }

    async fn analyze_news_trends(&self, args: &Value) -> Result<Value, ToolError> {
        let hours = opt_u32(args, "hours", 24)?;
        let min_mentions = opt_u32(args, "min_mentions", 3)?;

        let trends = self
            .analyzer
            .trending_topics(hours, min_mentions as usize)
            .await;

        let shown: Vec<Value> = trends
            .iter()
            .take(TREND_LIMIT)
            .map(|t| {
                let samples: Vec<ArticleRef> = t
                    .articles
                    .iter()
                    .take(TREND_SAMPLE_ARTICLES)
                    .map(ArticleRef::from)
                    .collect();
                json!({
                    "keyword": t.keyword,
                    "mentions": t.count,
                    "trend_score": round3(t.trend_score),
                    "sources": t.sources,
                    "companies": t.companies,
                    "first_seen": t.first_seen,
                    "last_seen": t.last_seen,
                    "sample_articles": samples,
                })
            })
            .collect();

        Ok(json!({
            "analysis_period": format!("{} hours", hours),
            "min_mentions_threshold": min_mentions,
            "trending_topics": trends.len(),
            "trends": shown,
        }))
    }

    async fn get_trending_keywords(&self, args: &Value) -> Result<Value, ToolError> {
        let hours = opt_u32(args, "hours", 24)?;
        let limit = opt_u32(args, "limit", KEYWORD_LIMIT)?;

        let keywords = self.analyzer.trending_keywords(hours, limit as usize).await;
        Ok(json!({
            "analysis_period": format!("{} hours", hours),
            "total_keywords": keywords.len(),
            "trending_keywords": keywords,
        }))
    }

    async fn detect_news_spikes(&self, args: &Value) -> Result<Value, ToolError> {
        let hours = opt_u32(args, "hours", 24)?;
        let comparison_hours = opt_u32(args, "comparison_hours", 168)?;

        let spikes = self.analyzer.detect_spikes(hours, comparison_hours).await;
        let shown: Vec<Value> = spikes
            .iter()
            .take(SPIKE_LIMIT)
            .map(|s| {
                json!({
                    "topic": s.topic,
                    "description": s.description,
                    "confidence": round3(s.confidence),
                    "evidence": s.evidence,
                    "timestamp": s.timestamp,
                })
            })
            .collect();

        Ok(json!({
            "analysis_period": format!("{} hours vs {} hours", hours, comparison_hours),
            "spikes_detected": spikes.len(),
            "spikes": shown,
        }))
    }

    async fn get_news_summary(&self, args: &Value) -> Result<Value, ToolError> {
        let hours = opt_u32(args, "hours", 24)?;

        let Some(mut summary) = self.analyzer.news_summary(hours).await else {
            return Ok(json!({}));
        };

        if let Some(narrator) = &self.narrator {
            match narrator.write_summary(&summary).await {
                Ok(text) => summary.narrative = Some(text),
                Err(e) => warn!("Narrative generation failed: {:#}", e),
            }
        }

        Ok(serde_json::to_value(summary)?)
    }

    async fn suggest_timely_topics(&self, args: &Value) -> Result<Value, ToolError> {
        let hours = opt_u32(args, "hours", 24)?;
        let suggestions = self.analyzer.suggest_topics(hours).await;

        Ok(json!({
            "analysis_period": format!("{} hours", hours),
            "suggestions_count": suggestions.len(),
            "suggestions": suggestions,
        }))
    }

    async fn search_news_articles(&self, args: &Value) -> Result<Value, ToolError> {
        let query = req_str(args, "query")?;
        let feed_id = opt_str(args, "feed_id")?;
        let hours = opt_u32(args, "hours", 168)?;

        let hits = self.service.search_articles(query, feed_id, hours).await?;
        let articles: Vec<Value> = hits
            .iter()
            .take(SEARCH_LIMIT)
            .map(|a| {
                json!({
                    "title": a.title,
                    "description": truncate(&a.description, DESCRIPTION_CHARS),
                    "url": a.url,
                    "published": a.published,
                    "source": a.source,
                    "feed_id": a.feed_id,
                    "keywords": a.keywords,
                })
            })
            .collect();

        Ok(json!({
            "query": query,
            "feed_id": feed_id.unwrap_or("all_feeds"),
            "search_period": format!("{} hours", hours),
            "results_count": articles.len(),
            "articles": articles,
        }))
    }

    async fn get_company_mentions(&self, args: &Value) -> Result<Value, ToolError> {
        let hours = opt_u32(args, "hours", 24)?;
        match self.analyzer.company_mentions(hours).await {
            Some(analysis) => Ok(serde_json::to_value(analysis)?),
            None => Ok(json!({})),
        }
    }

    async fn get_feed_statistics(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = opt_str(args, "feed_id")?;
        let stats: FeedStatistics = self.service.feed_statistics(feed_id).await?;
        Ok(serde_json::to_value(stats)?)
    }

    async fn debug_rss_feed(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = req_str(args, "feed_id")?;
        let report = self
            .service
            .debug_feed(feed_id)
            .await
            .map_err(|e| match e {
                FeedError::NotFound(id) => ToolError::FeedNotConfigured(id),
                other => ToolError::Feed(other),
            })?;
        Ok(serde_json::to_value(report)?)
    }

    async fn analyze_feed_keywords(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = req_str(args, "feed_id")?;
        let hours = opt_u32(args, "hours", 168)?;
        let analysis = self
            .service
            .keyword_analysis(feed_id, hours)
            .await
            .map_err(|e| match e {
                FeedError::NotFound(id) => ToolError::FeedNotConfigured(id),
                other => ToolError::Feed(other),
            })?;
        Ok(serde_json::to_value(analysis)?)
    }

    async fn get_all_feed_articles(&self, args: &Value) -> Result<Value, ToolError> {
        let feed_id = req_str(args, "feed_id")?;
        let limit = opt_u32(args, "limit", 20)?;
        let report = self
            .service
            .all_feed_articles(feed_id, limit as usize)
            .await
            .map_err(|e| match e {
                FeedError::NotFound(id) => ToolError::FeedNotConfigured(id),
                other => ToolError::Feed(other),
            })?;
        Ok(serde_json::to_value(report)?)
    }
}
