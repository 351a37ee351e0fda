//! Data models for the news monitor.
//!
//! This module contains the core data structures shared by the feed
//! service, the analyzer and the tool layer: articles, processed feeds,
//! trends, insights and topic suggestions.

use crate::feeds::FeedType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Coarse sentiment of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sentiment::Positive => write!(f, "positive"),
            Sentiment::Neutral => write!(f, "neutral"),
            Sentiment::Negative => write!(f, "negative"),
        }
    }
}

/// A news article taken from a feed entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    /// Entry id, or the link when the feed has no ids.
    pub id: String,
    /// Cleaned article title.
    pub title: String,
    /// Plain-text description or summary.
    pub description: String,
    /// Article URL (redirects already resolved for Google Alerts).
    pub url: String,
    /// Publication date exactly as the feed reported it.
    pub published: String,
    /// Publisher name, or the feed title as a fallback.
    pub source: String,
    /// Id of the feed this article came from.
    pub feed_id: String,
    /// Keywords matched in the title and description.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Sentiment, when the feed tracks it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<Sentiment>,
    /// Companies mentioned, when the feed extracts them.
    #[serde(default)]
    pub companies: Vec<String>,
}

impl NewsArticle {
    /// Title and description joined, the text every matcher works on.
    pub fn text(&self) -> String {
        format!("{} {}", self.title, self.description)
    }

    /// Parsed publication date, if the feed gave one we understand.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        crate::analysis::parse_published(&self.published)
    }
}

/// Channel-level metadata of a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeedMetadata {
    pub title: String,
    pub description: String,
    pub language: String,
    pub link: String,
    pub updated: String,
    pub author: String,
    pub copyright: String,
    /// Channel image URL, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Number of entries in the document.
    pub total_articles: usize,
}

/// A processed feed, as cached and served to the tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedData {
    pub feed_id: String,
    pub feed_name: String,
    pub feed_url: String,
    pub feed_type: FeedType,
    pub metadata: FeedMetadata,
    pub articles: Vec<NewsArticle>,
    /// When the feed was fetched and processed.
    pub last_updated: DateTime<Utc>,
    pub total_articles: usize,
    /// Search terms of a Google Alerts feed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alert_query: Option<String>,
}

/// A keyword that is trending across the monitored feeds.
#[derive(Debug, Clone, Serialize)]
pub struct TrendData {
    pub keyword: String,
    /// Number of articles mentioning the keyword.
    pub count: usize,
    #[serde(skip)]
    pub articles: Vec<NewsArticle>,
    /// Earliest publication date among the articles.
    pub first_seen: Option<DateTime<Utc>>,
    /// Latest publication date among the articles.
    pub last_seen: Option<DateTime<Utc>>,
    pub sources: Vec<String>,
    pub companies: Vec<String>,
    /// Score between 0 and 1.
    pub trend_score: f64,
}

/// Kind of insight the analyzer produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[allow(dead_code)] // Wire values; only spikes are produced today
pub enum InsightKind {
    Trend,
    Spike,
    CompanyMention,
    TopicEmergence,
}

/// A pattern found in the news, with the evidence behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    /// Topic the insight is about (a keyword or a company).
    pub topic: String,
    pub title: String,
    pub description: String,
    /// Confidence between 0 and 1.
    pub confidence: f64,
    pub evidence: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

/// How soon a suggested topic should be covered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Urgency::Low => write!(f, "low"),
            Urgency::Medium => write!(f, "medium"),
            Urgency::High => write!(f, "high"),
        }
    }
}

/// Where a topic suggestion came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    TrendingTopic,
    NewsSpike,
    CompanyFocus,
}

/// A timely topic worth writing about.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub topic: String,
    pub reason: String,
    pub urgency: Urgency,
    pub evidence: Value,
    pub suggested_angle: String,
}

/// Mentions of one company in the analysis window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompanyMention {
    pub company: String,
    pub mentions: usize,
    pub sources: Vec<String>,
    pub articles: usize,
}

/// Company mention analysis over a time window.
#[derive(Debug, Clone, Serialize)]
pub struct CompanyAnalysis {
    pub time_period: String,
    pub total_companies: usize,
    pub total_mentions: usize,
    pub top_companies: Vec<CompanyMention>,
    pub analysis_timestamp: DateTime<Utc>,
}

/// Short reference to an article inside analysis output.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleRef {
    pub title: String,
    pub source: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub published: String,
}

impl From<&NewsArticle> for ArticleRef {
    fn from(article: &NewsArticle) -> Self {
        Self {
            title: article.title.clone(),
            source: article.source.clone(),
            url: article.url.clone(),
            published: article.published.clone(),
        }
    }
}

/// A keyword ranked by raw mention count.
#[derive(Debug, Clone, Serialize)]
pub struct TrendingKeyword {
    pub keyword: String,
    pub count: usize,
    pub sources: Vec<String>,
    pub trend_score: f64,
    pub sample_articles: Vec<ArticleRef>,
}

/// Condensed view of a trend used in summaries.
#[derive(Debug, Clone, Serialize)]
pub struct TrendBrief {
    pub keyword: String,
    pub mentions: usize,
    pub trend_score: f64,
}

/// Condensed view of a spike used in summaries.
#[derive(Debug, Clone, Serialize)]
pub struct SpikeBrief {
    pub topic: String,
    pub confidence: f64,
}

/// Overall news summary for a time window.
#[derive(Debug, Clone, Serialize)]
pub struct NewsSummary {
    pub time_period: String,
    pub total_articles: usize,
    pub sources: usize,
    pub trending_topics: usize,
    pub news_spikes: usize,
    pub top_trends: Vec<TrendBrief>,
    pub top_companies: Vec<CompanyMention>,
    pub recent_spikes: Vec<SpikeBrief>,
    pub analysis_timestamp: DateTime<Utc>,
    /// LLM-written narrative, when an API key is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(published: &str) -> NewsArticle {
        NewsArticle {
            id: "1".to_string(),
            title: "OpenAI ships".to_string(),
            description: "a new model".to_string(),
            url: "https://example.com/a".to_string(),
            published: published.to_string(),
            source: "Example".to_string(),
            feed_id: "feed".to_string(),
            keywords: vec![],
            sentiment: None,
            companies: vec![],
        }
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::Low < Urgency::Medium);
        assert!(Urgency::Medium < Urgency::High);
    }

    #[test]
    fn test_article_text_and_date() {
        let a = article("2024-01-01T00:00:00Z");
        assert_eq!(a.text(), "OpenAI ships a new model");
        assert!(a.published_at().is_some());
        assert!(article("").published_at().is_none());
    }

    #[test]
    fn test_article_cache_shape() {
        let mut a = article("Mon, 01 Jan 2024 00:00:00 GMT");
        a.sentiment = Some(Sentiment::Positive);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["sentiment"], "positive");

        // Older cache entries carry no sentiment or companies at all
        let legacy = serde_json::json!({
            "id": "x", "title": "t", "description": "d", "url": "u",
            "published": "", "source": "s", "feed_id": "f"
        });
        let parsed: NewsArticle = serde_json::from_value(legacy).unwrap();
        assert!(parsed.companies.is_empty());
        assert!(parsed.sentiment.is_none());
    }

    #[test]
    fn test_insight_kind_wire_names() {
        assert_eq!(
            serde_json::to_value(InsightKind::CompanyMention).unwrap(),
            "company_mention"
        );
        assert_eq!(
            serde_json::to_value(SuggestionKind::TrendingTopic).unwrap(),
            "trending_topic"
        );
    }
}
