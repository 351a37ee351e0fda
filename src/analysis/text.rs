//! Text helpers shared by the feed service and the analyzer.
//!
//! Keyword and company extraction, a small lexicon sentiment scorer,
//! publication date parsing and display truncation.

use crate::models::Sentiment;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

/// Tech and business vocabulary every article is scanned for.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "artificial intelligence",
    "ai",
    "machine learning",
    "ml",
    "deep learning",
    "agentic ai",
    "agentic",
    "ai agents",
    "ai agent",
    "autonomous ai",
    "agent",
    "neural network",
    "nlp",
    "computer vision",
    "data science",
    "analytics",
    "big data",
    "python",
    "programming",
    "algorithm",
    "automation",
    "cloud computing",
    "aws",
    "azure",
    "gcp",
    "blockchain",
    "cryptocurrency",
    "startup",
    "venture capital",
    "funding",
    "ipo",
    "acquisition",
    "cybersecurity",
    "privacy",
    "gdpr",
    "regulation",
    "policy",
];

/// Companies recognised in article text (matched case-sensitively).
pub const KNOWN_COMPANIES: &[&str] = &[
    "Google",
    "Apple",
    "Microsoft",
    "Amazon",
    "Meta",
    "Facebook",
    "Tesla",
    "Netflix",
    "Spotify",
    "Uber",
    "Airbnb",
    "Twitter",
    "X",
    "LinkedIn",
    "Instagram",
    "YouTube",
    "OpenAI",
    "Anthropic",
    "IBM",
    "Oracle",
    "Salesforce",
    "Adobe",
    "Nvidia",
    "Intel",
    "AMD",
    "Qualcomm",
    "Samsung",
    "Sony",
    "Huawei",
    "Xiaomi",
];

const POSITIVE_WORDS: &[&str] = &[
    "boost", "breakthrough", "gain", "gains", "growth", "improve", "improves", "innovative",
    "launch", "launches", "partnership", "profit", "record", "rise", "rises", "soar", "soars",
    "success", "surge", "surges", "win", "wins",
];

const NEGATIVE_WORDS: &[&str] = &[
    "ban", "breach", "concern", "concerns", "crash", "cut", "cuts", "decline", "declines",
    "drop", "drops", "fail", "fails", "fine", "fined", "fraud", "hack", "hacked", "lawsuit",
    "layoffs", "loss", "losses", "risk", "warning",
];

static DEFAULT_MATCHERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    DEFAULT_KEYWORDS
        .iter()
        .filter_map(|k| word_matcher(k, true).map(|re| (*k, re)))
        .collect()
});

static COMPANY_MATCHERS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    KNOWN_COMPANIES
        .iter()
        .filter_map(|c| word_matcher(c, false).map(|re| (*c, re)))
        .collect()
});

/// Build a matcher for `term` that only hits whole words.
///
/// `\b` is not used because terms may end in punctuation (`c++`).
fn word_matcher(term: &str, case_insensitive: bool) -> Option<Regex> {
    let flags = if case_insensitive { "(?i)" } else { "" };
    Regex::new(&format!(
        r"{}(?:^|[^\w]){}(?:[^\w]|$)",
        flags,
        regex::escape(term.trim())
    ))
    .ok()
}

/// Case-insensitive whole-word containment test.
pub fn contains_term(text: &str, term: &str) -> bool {
    if term.trim().is_empty() {
        return false;
    }
    word_matcher(term, true)
        .map(|re| re.is_match(text))
        .unwrap_or(false)
}

/// Configured keywords found in `text`, keeping their configured spelling.
pub fn match_configured_keywords(text: &str, keywords: &[String]) -> Vec<String> {
    keywords
        .iter()
        .filter(|k| contains_term(text, k))
        .cloned()
        .collect()
}

/// Extract news keywords from article text.
///
/// Returns the predefined keywords found in the text plus any of the
/// default vocabulary, deduplicated and sorted.
pub fn extract_news_keywords(text: &str, predefined: &[String]) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut found: BTreeSet<String> = match_configured_keywords(text, predefined)
        .into_iter()
        .collect();

    for (keyword, matcher) in DEFAULT_MATCHERS.iter() {
        if matcher.is_match(text) {
            found.insert((*keyword).to_string());
        }
    }

    found.into_iter().collect()
}

/// Extract known company names from article text.
pub fn extract_companies(text: &str) -> Vec<String> {
    COMPANY_MATCHERS
        .iter()
        .filter(|(_, matcher)| matcher.is_match(text))
        .map(|(name, _)| (*name).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Score the sentiment of a piece of text with a small word lexicon.
pub fn score_sentiment(text: &str) -> Sentiment {
    let mut score: i32 = 0;
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = word.to_lowercase();
        if POSITIVE_WORDS.contains(&word.as_str()) {
            score += 1;
        } else if NEGATIVE_WORDS.contains(&word.as_str()) {
            score -= 1;
        }
    }

    match score {
        s if s > 0 => Sentiment::Positive,
        s if s < 0 => Sentiment::Negative,
        _ => Sentiment::Neutral,
    }
}

/// Parse a feed publication date.
///
/// Accepts RFC 3339 (Atom), RFC 2822 (RSS) and a few naive layouts seen in
/// the wild, which are taken as UTC.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    for layout in [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%d %b %Y %H:%M:%S",
    ] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, layout) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Shorten `text` to `max_chars` characters, appending `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
