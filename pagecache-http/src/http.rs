//! HTTP fetcher implementation.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use pagecache_core::constants::{DEFAULT_FETCH_TIMEOUT_SECONDS, DEFAULT_USER_AGENT};
use pagecache_core::error::{PageCacheError, Result};
use pagecache_core::traits::PageFetcher;

/// HTTP fetcher configuration.
#[derive(Clone, Debug)]
pub struct HttpFetcherConfig {
    /// Request timeout in seconds, covering connect through body read
    pub timeout_seconds: u64,
    /// User-Agent header sent with every request
    pub user_agent: String,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_FETCH_TIMEOUT_SECONDS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl HttpFetcherConfig {
    /// Sets the request timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout_seconds = seconds;
        self
    }

    /// Sets the User-Agent header.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Fetches pages over HTTP(S).
///
/// The underlying `reqwest::Client` pools connections, so one fetcher
/// should be shared for the life of the process.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    config: HttpFetcherConfig,
    http_client: reqwest::Client,
}

impl HttpFetcher {
    /// Creates a fetcher with default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(HttpFetcherConfig::default())
    }

    /// Creates a fetcher with the given config.
    pub fn with_config(config: HttpFetcherConfig) -> Result<Self> {
        if config.timeout_seconds == 0 {
            return Err(PageCacheError::ConfigError(
                "fetch timeout must be at least one second".into(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| PageCacheError::ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &HttpFetcherConfig {
        &self.config
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    #[instrument(skip(self))]
    async fn fetch_page(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            let reason = if e.is_timeout() {
                format!("timed out after {}s", self.config.timeout_seconds)
            } else {
                e.to_string()
            };
            warn!(url, %reason, "Request failed");
            PageCacheError::fetch_failed(url, reason)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!(url, %status, "Non-success status");
            return Err(PageCacheError::fetch_failed(url, format!("HTTP {}", status)));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| PageCacheError::fetch_failed(url, e.to_string()))?;

        debug!(url, len = body.len(), "Fetched page");
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_config_builder() {
        let config = HttpFetcherConfig::default()
            .with_timeout(5)
            .with_user_agent("test-agent");
        assert_eq!(config.timeout_seconds, 5);
        assert_eq!(config.user_agent, "test-agent");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = HttpFetcher::with_config(HttpFetcherConfig::default().with_timeout(0));
        assert!(matches!(result, Err(PageCacheError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>hello</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let body = fetcher.fetch_page(&server.uri()).await.unwrap();
        assert_eq!(body, b"<html>hello</html>");
    }

    #[tokio::test]
    async fn test_fetch_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(header("user-agent", "pagecache-test"))
            .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher =
            HttpFetcher::with_config(HttpFetcherConfig::default().with_user_agent("pagecache-test"))
                .unwrap();
        assert_eq!(fetcher.fetch_page(&server.uri()).await.unwrap(), b"ok");
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new().unwrap();
        let url = format!("{}/missing", server.uri());
        let err = fetcher.fetch_page(&url).await.unwrap_err();

        match err {
            PageCacheError::FetchFailed { url: failed, reason } => {
                assert_eq!(failed, url);
                assert!(reason.contains("404"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("late")
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_config(HttpFetcherConfig::default().with_timeout(1)).unwrap();
        let err = fetcher.fetch_page(&server.uri()).await.unwrap_err();
        assert!(err.is_fetch_error());
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_fetch_unreachable_host() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch_page("http://127.0.0.1:1/").await.unwrap_err();
        assert!(err.is_fetch_error());
    }

    #[tokio::test]
    async fn test_fetch_invalid_url() {
        let fetcher = HttpFetcher::new().unwrap();
        let err = fetcher.fetch_page("not a url").await.unwrap_err();
        assert!(err.is_fetch_error());
    }
}
