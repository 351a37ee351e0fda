//! Markdown and JSON digest generation.
//!
//! A digest bundles the news summary, trends, spikes, company mentions and
//! topic suggestions for one time window, for the one-shot `--digest` mode.

use crate::analysis::NewsAnalyzer;
use crate::models::{CompanyAnalysis, NewsInsight, NewsSummary, Suggestion, TrendData, Urgency};
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Everything the analyzer knows about one time window.
#[derive(Debug, Clone, Serialize)]
pub struct Digest {
    pub generated_at: DateTime<Utc>,
    pub hours: u32,
    pub summary: Option<NewsSummary>,
    pub trends: Vec<TrendData>,
    pub spikes: Vec<NewsInsight>,
    pub companies: Option<CompanyAnalysis>,
    pub suggestions: Vec<Suggestion>,
}

impl Digest {
    /// Run every analysis over the last `hours`.
    pub async fn collect(analyzer: &NewsAnalyzer, hours: u32) -> Self {
        let summary = analyzer.news_summary(hours).await;
        let trends = analyzer.trending_topics(hours, 3).await;
        let spikes = analyzer.detect_spikes(hours, 168).await;
        let companies = analyzer.company_mentions(hours).await;
        let suggestions = analyzer.suggest_topics(hours).await;

        Self {
            generated_at: Utc::now(),
            hours,
            summary,
            trends,
            spikes,
            companies,
            suggestions,
        }
    }
}

/// Generate a complete Markdown digest.
pub fn generate_markdown_digest(digest: &Digest) -> String {
    let mut output = String::new();

    output.push_str("# News Digest\n\n");
    output.push_str(&generate_metadata_section(digest));

    match &digest.summary {
        Some(summary) => output.push_str(&generate_summary_section(summary)),
        None => {
            output.push_str("## Summary\n\n");
            output.push_str("No articles were published in this period.\n\n");
        }
    }

    output.push_str(&generate_trends_section(&digest.trends));
    output.push_str(&generate_spikes_section(&digest.spikes));
    if let Some(companies) = &digest.companies {
        output.push_str(&generate_companies_section(companies));
    }
    output.push_str(&generate_suggestions_section(&digest.suggestions));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(digest: &Digest) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "- **Generated:** {}\n",
        digest.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Period:** last {} hours\n", digest.hours));
    if let Some(summary) = &digest.summary {
        section.push_str(&format!(
            "- **Articles:** {} from {} sources\n",
            summary.total_articles, summary.sources
        ));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &NewsSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    if let Some(narrative) = &summary.narrative {
        section.push_str(narrative);
        section.push_str("\n\n");
    }

    section.push_str("| Articles | Sources | Trending Topics | Spikes |\n");
    section.push_str("|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} |\n\n",
        summary.total_articles, summary.sources, summary.trending_topics, summary.news_spikes
    ));

    section
}

fn generate_trends_section(trends: &[TrendData]) -> String {
    let mut section = String::new();

    section.push_str("## Trending Topics\n\n");
    if trends.is_empty() {
        section.push_str("No topic reached the trending threshold.\n\n");
        return section;
    }

    section.push_str("| Keyword | Mentions | Score | Sources |\n");
    section.push_str("|:---|:---:|:---:|:---|\n");
    for trend in trends.iter().take(10) {
        section.push_str(&format!(
            "| {} | {} | {:.3} | {} |\n",
            trend.keyword,
            trend.count,
            trend.trend_score,
            trend.sources.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn generate_spikes_section(spikes: &[NewsInsight]) -> String {
    if spikes.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## News Spikes\n\n");
    for spike in spikes.iter().take(10) {
        section.push_str(&format!(
            "- **{}** (confidence {:.2}): {}\n",
            spike.topic, spike.confidence, spike.description
        ));
    }
    section.push('\n');

    section
}

fn generate_companies_section(companies: &CompanyAnalysis) -> String {
    if companies.top_companies.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Companies in the News\n\n");
    section.push_str("| Company | Mentions | Sources |\n");
    section.push_str("|:---|:---:|:---|\n");
    for mention in &companies.top_companies {
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            mention.company,
            mention.mentions,
            mention.sources.join(", ")
        ));
    }
    section.push('\n');

    section
}

fn generate_suggestions_section(suggestions: &[Suggestion]) -> String {
    if suggestions.is_empty() {
        return String::new();
    }

    let mut section = String::new();
    section.push_str("## Suggested Topics\n\n");
    for (i, suggestion) in suggestions.iter().enumerate() {
        let badge = match suggestion.urgency {
            Urgency::High => "🔴 **HIGH**",
            Urgency::Medium => "🟡 **MEDIUM**",
            Urgency::Low => "🟢 **LOW**",
        };
        section.push_str(&format!(
            "{}. {} {}: {}\n   > {}\n",
            i + 1,
            badge,
            suggestion.topic,
            suggestion.reason,
            suggestion.suggested_angle
        ));
    }
    section.push('\n');

    section
}

fn generate_footer() -> String {
    format!("---\n\n*Digest generated by newswire v{}*\n", env!("CARGO_PKG_VERSION"))
}

/// Generate a JSON digest.
pub fn generate_json_digest(digest: &Digest) -> Result<String> {
    serde_json::to_string_pretty(digest).map_err(Into::into)
}
