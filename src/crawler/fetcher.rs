//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - The `Fetcher` seam the crawler downloads through
//! - Building HTTP clients with proper user agent strings
//! - Error classification into transport and status failures

use crate::config::UserAgentConfig;
use crate::SpiderError;
use reqwest::{redirect::Policy, Client};
use std::future::Future;
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed for a single request
const MAX_REDIRECTS: usize = 10;

/// Downloads the body of a URL
pub trait Fetcher: Send + Sync + 'static {
    /// Fetches `url` and returns its body as text
    ///
    /// Non-success statuses and transport failures are errors.
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<String, SpiderError>> + Send;
}

/// Formats the User-Agent header value
pub fn user_agent(config: &UserAgentConfig) -> String {
    format!("{}/{}", config.crawler_name, config.crawler_version)
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent(config))
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(config.timeout_secs.min(10)))
        .redirect(Policy::limited(MAX_REDIRECTS))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetcher backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a fetcher from the user agent configuration
    pub fn from_config(config: &UserAgentConfig) -> Result<Self, SpiderError> {
        let client = build_http_client(config)
            .map_err(|e| SpiderError::Setup(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self::new(client))
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<String, SpiderError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SpiderError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| transport_error(url, &e))
    }
}

/// Classifies a reqwest error into a transport failure
fn transport_error(url: &Url, error: &reqwest::Error) -> SpiderError {
    let message = if error.is_timeout() {
        "Request timeout".to_string()
    } else if error.is_connect() {
        "Connection refused".to_string()
    } else if error.is_redirect() {
        format!("Too many redirects (limit {})", MAX_REDIRECTS)
    } else {
        error.to_string()
    };

    SpiderError::Transport {
        url: url.to_string(),
        message,
    }
}
