//! Google Alerts specifics.
//!
//! Alert entries wrap article links in Google redirects, put the
//! publisher at the end of the title and carry HTML in titles and
//! descriptions.

use super::parser::RawEntry;
use crate::models::FeedMetadata;
use scraper::Html;
use url::Url;

const ALERT_TITLE_PREFIX: &str = "Google Alert - ";

/// Whether `url` points at a Google Alerts feed.
pub fn is_google_alerts_url(url: &str) -> bool {
    url.contains("google.com/alerts/feeds")
}

/// Plain text of an HTML fragment, with entities decoded.
pub fn strip_html(fragment: &str) -> String {
    if !fragment.contains('<') && !fragment.contains('&') {
        return fragment.to_string();
    }
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect()
}

/// Strip HTML and collapse runs of whitespace (non-breaking spaces included).
pub fn clean_description(raw: &str) -> String {
    strip_html(raw).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Title without the trailing ` - Publisher` segment.
pub fn clean_title(raw: &str) -> String {
    let title = clean_description(raw);
    match title.rsplit_once(" - ") {
        Some((head, _)) => head.trim().to_string(),
        None => title,
    }
}

/// Publisher taken from the trailing ` - Publisher` title segment.
pub fn source_from_title(raw: &str) -> String {
    clean_description(raw)
        .rsplit_once(" - ")
        .map(|(_, source)| source.trim().to_string())
        .unwrap_or_default()
}

/// Resolve a Google redirect link to the article URL.
///
/// Uses the `url` query parameter, then `q`, and falls back to the raw link.
pub fn extract_link(raw: &str) -> String {
    let Ok(parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    for key in ["url", "q"] {
        if let Some((_, value)) = parsed.query_pairs().find(|(k, _)| k == key) {
            if !value.is_empty() {
                return value.into_owned();
            }
        }
    }
    raw.to_string()
}

/// Search query of the alert, read from the feed title or description.
pub fn alert_query(metadata: &FeedMetadata) -> String {
    [&metadata.title, &metadata.description]
        .into_iter()
        .find_map(|text| {
            text.find(ALERT_TITLE_PREFIX)
                .map(|pos| text[pos + ALERT_TITLE_PREFIX.len()..].trim().to_string())
        })
        .filter(|q| !q.is_empty())
        .unwrap_or_default()
}

/// Clean an alert entry: title, publisher, link and descriptions.
pub fn normalize_entry(entry: RawEntry) -> RawEntry {
    let source = if entry.source.is_empty() {
        source_from_title(&entry.title)
    } else {
        entry.source
    };

    RawEntry {
        title: clean_title(&entry.title),
        description: clean_description(&entry.description),
        summary: clean_description(&entry.summary),
        link: extract_link(&entry.link),
        source,
        ..entry
    }
}
