//! Page transport
//!
//! This module defines the session-scoped fetch capability the crawler
//! consumes, and its HTTP implementation:
//! - Building a fresh HTTP client per session
//! - Routing requests through a forwarding proxy when configured
//! - Classifying non-success responses as errors

use crate::config::{ProxyConfig, TransportConfig};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// A fetched page
#[derive(Debug, Clone)]
pub struct Page {
    /// The requested (target) URL, not the proxy URL
    pub url: String,

    /// Raw response body
    pub body: String,
}

/// Errors raised by a transport or one of its sessions
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Failed to open session: {0}")]
    Session(String),

    #[error("Session already closed")]
    Closed,

    #[error("Invalid proxy URL for {url}: {message}")]
    Proxy { url: String, message: String },
}

/// Opens fetch sessions
///
/// A new session is opened for every fetch attempt, so state left behind by
/// a failed attempt can never leak into the next one.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open_session(&self) -> Result<Box<dyn Session>, TransportError>;
}

/// A single-use fetch session
#[async_trait]
pub trait Session: Send {
    /// Fetches `url` and returns its content
    async fn fetch(&mut self, url: &str) -> Result<Page, TransportError>;

    /// Releases the session's resources
    async fn close(&mut self);
}

/// HTTP transport backed by reqwest
#[derive(Debug, Clone)]
pub struct HttpTransport {
    config: TransportConfig,
    proxy: Option<ProxyConfig>,
}

impl HttpTransport {
    pub fn new(config: TransportConfig, proxy: Option<ProxyConfig>) -> Self {
        Self { config, proxy }
    }

    fn build_client(&self) -> Result<Client, reqwest::Error> {
        Client::builder()
            .user_agent(self.config.user_agent.as_str())
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .gzip(true)
            .brotli(true)
            .build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_session(&self) -> Result<Box<dyn Session>, TransportError> {
        let client = self
            .build_client()
            .map_err(|e| TransportError::Session(e.to_string()))?;

        Ok(Box::new(HttpSession {
            client: Some(client),
            proxy: self.proxy.clone(),
        }))
    }
}

/// One HTTP session; the client (and its connection pool) dies with it
pub struct HttpSession {
    client: Option<Client>,
    proxy: Option<ProxyConfig>,
}

#[async_trait]
impl Session for HttpSession {
    async fn fetch(&mut self, url: &str) -> Result<Page, TransportError> {
        let client = self.client.as_ref().ok_or(TransportError::Closed)?;

        let request_url = match &self.proxy {
            Some(proxy) => proxied_url(proxy, url)?,
            None => url.to_string(),
        };

        let response = client
            .get(&request_url)
            .send()
            .await
            .map_err(|source| TransportError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(|source| TransportError::Http {
            url: url.to_string(),
            source,
        })?;

        Ok(Page {
            url: url.to_string(),
            body,
        })
    }

    async fn close(&mut self) {
        self.client = None;
    }
}

/// Wraps a target URL in a forwarding-proxy request
///
/// # Example
///
/// ```
/// use review_harvest::config::ProxyConfig;
/// use review_harvest::crawler::proxied_url;
///
/// let proxy = ProxyConfig {
///     endpoint: "https://proxy.example.com/v1/".to_string(),
///     api_key: "KEY".to_string(),
///     country: "us".to_string(),
/// };
/// let url = proxied_url(&proxy, "https://www.g2.com/search?query=crm").unwrap();
/// assert!(url.starts_with("https://proxy.example.com/v1/?api_key=KEY&url=https%3A%2F%2F"));
/// ```
pub fn proxied_url(proxy: &ProxyConfig, target: &str) -> Result<String, TransportError> {
    let url = Url::parse_with_params(
        &proxy.endpoint,
        &[
            ("api_key", proxy.api_key.as_str()),
            ("url", target),
            ("country", proxy.country.as_str()),
        ],
    )
    .map_err(|e| TransportError::Proxy {
        url: target.to_string(),
        message: e.to_string(),
    })?;
    Ok(url.into())
}
