//! Trend analysis and insights over monitored news.
//!
//! The free functions here are pure: they take articles and a reference
//! time and compute trends, spikes, company mentions and suggestions.
//! [`NewsAnalyzer`] wires them to the feed service.

use crate::analysis::text::{extract_companies, extract_news_keywords};
use crate::feeds::FeedService;
use crate::models::{
    ArticleRef, CompanyAnalysis, CompanyMention, InsightKind, NewsArticle, NewsInsight,
    NewsSummary, SpikeBrief, Suggestion, SuggestionKind, TrendBrief, TrendData, TrendingKeyword,
    Urgency,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::debug;

/// Recent-to-historical rate ratio above which coverage counts as a spike.
const SPIKE_RATIO_THRESHOLD: f64 = 2.0;
/// Minimum mentions in the recent window for a spike.
const SPIKE_MIN_RECENT: usize = 3;
/// Articles needed for a full frequency score.
const FREQUENCY_NORM: f64 = 10.0;
/// Distinct sources needed for a full diversity score.
const SOURCE_NORM: f64 = 5.0;

/// Keywords of an article, from the default vocabulary only.
fn article_keywords(article: &NewsArticle) -> Vec<String> {
    extract_news_keywords(&article.text(), &[])
}

fn sorted(set: BTreeSet<String>) -> Vec<String> {
    set.into_iter().collect()
}

/// Score how strongly a keyword is trending, between 0 and 1.
///
/// Weighted mix of frequency (40%), mean recency of dated articles (40%)
/// and source diversity (20%).
pub fn trend_score(articles: &[NewsArticle], hours: u32, now: DateTime<Utc>) -> f64 {
    if articles.is_empty() {
        return 0.0;
    }

    let frequency = (articles.len() as f64 / FREQUENCY_NORM).min(1.0);

    let recency_scores: Vec<f64> = articles
        .iter()
        .filter_map(|a| a.published_at())
        .map(|published| {
            if hours == 0 {
                return 0.0;
            }
            let age_hours = (now - published).num_seconds() as f64 / 3600.0;
            (1.0 - age_hours / hours as f64).clamp(0.0, 1.0)
        })
        .collect();
    let recency = if recency_scores.is_empty() {
        0.0
    } else {
        recency_scores.iter().sum::<f64>() / recency_scores.len() as f64
    };

    let sources: BTreeSet<&str> = articles.iter().map(|a| a.source.as_str()).collect();
    let diversity = (sources.len() as f64 / SOURCE_NORM).min(1.0);

    frequency * 0.4 + recency * 0.4 + diversity * 0.2
}

/// Group articles by keyword and keep those with at least `min_mentions`.
pub fn trending_topics(
    articles: &[NewsArticle],
    hours: u32,
    min_mentions: usize,
    now: DateTime<Utc>,
) -> Vec<TrendData> {
    let mut by_keyword: BTreeMap<String, Vec<NewsArticle>> = BTreeMap::new();
    let mut sources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    let mut companies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for article in articles {
        let text = article.text();
        let article_companies = extract_companies(&text);

        for keyword in extract_news_keywords(&text, &[]) {
            by_keyword
                .entry(keyword.clone())
                .or_default()
                .push(article.clone());
            sources
                .entry(keyword.clone())
                .or_default()
                .insert(article.source.clone());
            companies
                .entry(keyword)
                .or_default()
                .extend(article_companies.iter().cloned());
        }
    }

    let mut trends: Vec<TrendData> = by_keyword
        .into_iter()
        .filter(|(_, list)| list.len() >= min_mentions)
        .map(|(keyword, list)| {
            let dates: Vec<DateTime<Utc>> = list.iter().filter_map(|a| a.published_at()).collect();
            TrendData {
                trend_score: trend_score(&list, hours, now),
                count: list.len(),
                first_seen: dates.iter().min().copied(),
                last_seen: dates.iter().max().copied(),
                sources: sorted(sources.remove(&keyword).unwrap_or_default()),
                companies: sorted(companies.remove(&keyword).unwrap_or_default()),
                articles: list,
                keyword,
            }
        })
        .collect();

    trends.sort_by(|a, b| b.trend_score.total_cmp(&a.trend_score));
    trends
}

/// Count keyword mentions across articles.
fn count_keywords(articles: &[NewsArticle]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for article in articles {
        for keyword in article_keywords(article) {
            *counts.entry(keyword).or_insert(0) += 1;
        }
    }
    counts
}

/// Detect keywords whose recent coverage rate jumped against a longer window.
pub fn detect_spikes(
    recent: &[NewsArticle],
    historical: &[NewsArticle],
    hours: u32,
    comparison_hours: u32,
    now: DateTime<Utc>,
) -> Vec<NewsInsight> {
    if recent.is_empty() || historical.is_empty() || hours == 0 || comparison_hours == 0 {
        return Vec::new();
    }

    let recent_counts = count_keywords(recent);
    let historical_counts = count_keywords(historical);

    let mut spikes: Vec<NewsInsight> = recent_counts
        .into_iter()
        .filter_map(|(keyword, recent_count)| {
            let historical_count = historical_counts.get(&keyword).copied().unwrap_or(0);
            let recent_rate = recent_count as f64 / hours as f64;
            let historical_rate = historical_count as f64 / comparison_hours as f64;

            if historical_rate <= 0.0 {
                return None;
            }
            let ratio = recent_rate / historical_rate;
            if ratio <= SPIKE_RATIO_THRESHOLD || recent_count < SPIKE_MIN_RECENT {
                return None;
            }

            debug!("Spike on '{}': ratio {:.2}", keyword, ratio);
            Some(NewsInsight {
                kind: InsightKind::Spike,
                title: format!("News spike detected: {}", keyword),
                description: format!(
                    "'{}' mentioned {} times in last {}h vs {} times in last {}h",
                    keyword, recent_count, hours, historical_count, comparison_hours
                ),
                confidence: (ratio / 10.0).min(1.0),
                evidence: vec![
                    format!("Spike ratio: {:.2}x", ratio),
                    format!("Recent mentions: {}", recent_count),
                ],
                timestamp: now,
                topic: keyword,
            })
        })
        .collect();

    spikes.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    spikes
}

/// Count company mentions. Returns `None` when there is nothing to analyze.
pub fn company_mentions(
    articles: &[NewsArticle],
    hours: u32,
    now: DateTime<Utc>,
) -> Option<CompanyAnalysis> {
    if articles.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut sources: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for article in articles {
        for company in extract_companies(&article.text()) {
            *counts.entry(company.clone()).or_insert(0) += 1;
            sources
                .entry(company)
                .or_default()
                .insert(article.source.clone());
        }
    }

    let total_mentions = counts.values().sum();
    let total_companies = counts.len();

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    ranked.truncate(10);

    let top_companies = ranked
        .into_iter()
        .map(|(company, mentions)| CompanyMention {
            sources: sorted(sources.remove(&company).unwrap_or_default()),
            // One mention is counted per article
            articles: mentions,
            mentions,
            company,
        })
        .collect();

    Some(CompanyAnalysis {
        time_period: format!("{} hours", hours),
        total_companies,
        total_mentions,
        top_companies,
        analysis_timestamp: now,
    })
}

/// Most common keywords, with sources, score and sample articles.
pub fn trending_keywords(
    articles: &[NewsArticle],
    hours: u32,
    limit: usize,
    now: DateTime<Utc>,
) -> Vec<TrendingKeyword> {
    let mut by_keyword: BTreeMap<String, Vec<NewsArticle>> = BTreeMap::new();
    for article in articles {
        for keyword in article_keywords(article) {
            by_keyword.entry(keyword).or_default().push(article.clone());
        }
    }

    let mut ranked: Vec<(String, Vec<NewsArticle>)> = by_keyword.into_iter().collect();
    ranked.sort_by_key(|(_, list)| std::cmp::Reverse(list.len()));
    ranked.truncate(limit);

    ranked
        .into_iter()
        .map(|(keyword, list)| {
            let sources: BTreeSet<String> = list.iter().map(|a| a.source.clone()).collect();
            TrendingKeyword {
                count: list.len(),
                sources: sorted(sources),
                trend_score: trend_score(&list, hours, now),
                sample_articles: list
                    .iter()
                    .take(3)
                    .map(|a| ArticleRef {
                        title: a.title.clone(),
                        source: a.source.clone(),
                        url: String::new(),
                        published: String::new(),
                    })
                    .collect(),
                keyword,
            }
        })
        .collect()
}

/// Suggest an editorial angle for a keyword.
pub fn topic_angle(keyword: &str, articles: &[NewsArticle]) -> String {
    if articles.is_empty() {
        return format!("Explore the latest developments in {}", keyword);
    }

    let angle = match keyword.to_lowercase().as_str() {
        "ai" => "The AI revolution: What's happening now and what's next",
        "artificial intelligence" => "AI breakthroughs and their real-world impact",
        "machine learning" => "Machine learning trends shaping the future",
        "data science" => "Data science innovations and applications",
        "startup" => "Startup landscape analysis and emerging opportunities",
        "funding" => "Investment trends and what they mean for tech funding",
        "regulation" => "Regulatory changes and their impact on innovation",
        "privacy" => "Privacy concerns in the digital age",
        "cybersecurity" => "Cybersecurity threats and defensive strategies",
        "agentic ai" => "The rise of autonomous agentic AI and its implications",
        "automation" => "Automation trends and their impact on industries",
        _ => {
            return format!(
                "Deep dive into {}: trends, challenges, and opportunities",
                keyword
            )
        }
    };
    angle.to_string()
}

/// Build topic suggestions from trends, spikes and company mentions.
///
/// Takes the top 5 trends, the top 3 spikes and the most mentioned company,
/// then orders by urgency (stable, so sources keep their rank).
pub fn suggest_topics(
    trends: &[TrendData],
    spikes: &[NewsInsight],
    companies: Option<&CompanyAnalysis>,
) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();

    for trend in trends.iter().take(5) {
        suggestions.push(Suggestion {
            kind: SuggestionKind::TrendingTopic,
            topic: trend.keyword.clone(),
            reason: format!("Trending in news with {} mentions", trend.count),
            urgency: if trend.trend_score > 0.7 {
                Urgency::High
            } else {
                Urgency::Medium
            },
            evidence: json!({
                "mentions": trend.count,
                "sources": trend.sources,
                "companies": trend.companies,
                "sample_articles": trend
                    .articles
                    .iter()
                    .take(3)
                    .map(|a| json!({"title": a.title, "source": a.source, "url": a.url}))
                    .collect::<Vec<_>>(),
            }),
            suggested_angle: topic_angle(&trend.keyword, &trend.articles),
        });
    }

    for spike in spikes.iter().take(3) {
        suggestions.push(Suggestion {
            kind: SuggestionKind::NewsSpike,
            topic: spike.topic.clone(),
            reason: spike.description.clone(),
            urgency: Urgency::High,
            evidence: json!({
                "confidence": spike.confidence,
                "details": spike.evidence,
            }),
            suggested_angle: format!(
                "Breaking down the recent surge in {} news",
                spike.topic
            ),
        });
    }

    if let Some(top) = companies.and_then(|c| c.top_companies.first()) {
        suggestions.push(Suggestion {
            kind: SuggestionKind::CompanyFocus,
            topic: format!("{} in the news", top.company),
            reason: format!("Most mentioned company with {} mentions", top.mentions),
            urgency: Urgency::Medium,
            evidence: json!({
                "mentions": top.mentions,
                "sources": top.sources,
            }),
            suggested_angle: format!(
                "Analysis of {}'s recent developments and their impact",
                top.company
            ),
        });
    }

    suggestions.sort_by(|a, b| b.urgency.cmp(&a.urgency));
    suggestions
}

/// Assemble the news summary for a window. `None` when there are no articles.
pub fn news_summary(
    articles: &[NewsArticle],
    trends: &[TrendData],
    companies: Option<&CompanyAnalysis>,
    spikes: &[NewsInsight],
    hours: u32,
    now: DateTime<Utc>,
) -> Option<NewsSummary> {
    if articles.is_empty() {
        return None;
    }

    let sources: BTreeSet<&str> = articles.iter().map(|a| a.source.as_str()).collect();

    Some(NewsSummary {
        time_period: format!("{} hours", hours),
        total_articles: articles.len(),
        sources: sources.len(),
        trending_topics: trends.len(),
        news_spikes: spikes.len(),
        top_trends: trends
            .iter()
            .take(5)
            .map(|t| TrendBrief {
                keyword: t.keyword.clone(),
                mentions: t.count,
                trend_score: t.trend_score,
            })
            .collect(),
        top_companies: companies
            .map(|c| c.top_companies.iter().take(5).cloned().collect())
            .unwrap_or_default(),
        recent_spikes: spikes
            .iter()
            .take(3)
            .map(|s| SpikeBrief {
                topic: s.topic.clone(),
                confidence: s.confidence,
            })
            .collect(),
        analysis_timestamp: now,
        narrative: None,
    })
}

/// Analyzer bound to the feed service.
pub struct NewsAnalyzer {
    service: Arc<FeedService>,
}

impl NewsAnalyzer {
    pub fn new(service: Arc<FeedService>) -> Self {
        Self { service }
    }

    /// Trending topics over the last `hours`.
    pub async fn trending_topics(&self, hours: u32, min_mentions: usize) -> Vec<TrendData> {
        let articles = self.service.trend_articles(hours).await;
        trending_topics(&articles, hours, min_mentions, Utc::now())
    }

    /// Coverage spikes of the last `hours` against the last `comparison_hours`.
    pub async fn detect_spikes(&self, hours: u32, comparison_hours: u32) -> Vec<NewsInsight> {
        let recent = self.service.trend_articles(hours).await;
        let historical = self.service.trend_articles(comparison_hours).await;
        detect_spikes(&recent, &historical, hours, comparison_hours, Utc::now())
    }

    /// Company mentions over the last `hours`.
    pub async fn company_mentions(&self, hours: u32) -> Option<CompanyAnalysis> {
        let articles = self.service.all_recent_articles(hours).await;
        company_mentions(&articles, hours, Utc::now())
    }

    /// Keywords ranked by mention count.
    pub async fn trending_keywords(&self, hours: u32, limit: usize) -> Vec<TrendingKeyword> {
        let articles = self.service.trend_articles(hours).await;
        trending_keywords(&articles, hours, limit, Utc::now())
    }

    /// Timely topic suggestions.
    pub async fn suggest_topics(&self, hours: u32) -> Vec<Suggestion> {
        let trends = self.trending_topics(hours, 3).await;
        let spikes = self.detect_spikes(hours, 168).await;
        let companies = self.company_mentions(hours).await;
        suggest_topics(&trends, &spikes, companies.as_ref())
    }

    /// Summary of the last `hours` of news.
    pub async fn news_summary(&self, hours: u32) -> Option<NewsSummary> {
        let articles = self.service.all_recent_articles(hours).await;
        if articles.is_empty() {
            return None;
        }
        let trends = self.trending_topics(hours, 2).await;
        let companies = self.company_mentions(hours).await;
        let spikes = self.detect_spikes(hours, 168).await;
        news_summary(
            &articles,
            &trends,
            companies.as_ref(),
            &spikes,
            hours,
            Utc::now(),
        )
    }
}
