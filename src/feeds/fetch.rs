//! Feed retrieval over HTTP.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Browser-like User-Agent; some publishers refuse unknown clients.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// Errors while fetching or processing a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed '{0}' not found")]
    NotFound(String),

    #[error("Feed '{0}' is disabled")]
    Disabled(String),

    #[error("Request to {url} timed out")]
    Timeout { url: String },

    #[error("Cannot connect to {url}: {message}")]
    Connect { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to fetch {url}: {message}")]
    Http { url: String, message: String },

    #[error("Failed to parse feed: {0}")]
    Parse(String),
}

/// Source of raw feed documents.
#[async_trait]
pub trait FeedFetcher: Send + Sync {
    /// Fetch the document at `url` and return its body.
    async fn fetch(&self, url: &str) -> Result<String, FeedError>;
}

/// Fetcher backed by a shared reqwest client.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout_seconds: u64, user_agent: &str) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(user_agent)
            .build()
            .map_err(|e| FeedError::Http {
                url: String::new(),
                message: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self { client })
    }
}

fn map_request_error(url: &str, e: reqwest::Error) -> FeedError {
    if e.is_timeout() {
        FeedError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        FeedError::Connect {
            url: url.to_string(),
            message: e.to_string(),
        }
    } else {
        FeedError::Http {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl FeedFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FeedError> {
        debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_request_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| map_request_error(url, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = FeedError::Status {
            url: "https://example.com/rss".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "https://example.com/rss returned HTTP 404");
        assert_eq!(
            FeedError::Disabled("tc".to_string()).to_string(),
            "Feed 'tc' is disabled"
        );
    }

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new(30, DEFAULT_USER_AGENT).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_an_error() {
        let fetcher = HttpFetcher::new(2, DEFAULT_USER_AGENT).unwrap();
        // Port 9 on localhost is not expected to serve HTTP
        let result = fetcher.fetch("http://127.0.0.1:9/feed").await;
        assert!(result.is_err());
    }
}
