use serde::Deserialize;

/// Main configuration structure for Review-Harvest
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub site: SiteConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
    pub output: OutputConfig,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of concurrent fetches
    #[serde(rename = "max-workers")]
    pub max_workers: u32,

    /// Number of retries after the first failed attempt
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Number of search result pages to fetch per keyword
    pub pages: u32,

    /// Number of buffered records that triggers a flush
    #[serde(rename = "flush-threshold", default = "default_flush_threshold")]
    pub flush_threshold: usize,
}

/// Target site configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Listing endpoint; `page` and `query` parameters are appended
    #[serde(rename = "search-url")]
    pub search_url: String,
}

/// HTTP transport configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (seconds)
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Forwarding proxy that receives the target URL as a query parameter
#[derive(Debug, Clone, Deserialize)]
pub struct ProxyConfig {
    pub endpoint: String,

    #[serde(rename = "api-key")]
    pub api_key: String,

    #[serde(default = "default_country")]
    pub country: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory receiving one delimited file per job
    pub directory: String,
}

fn default_flush_threshold() -> usize {
    50
}

fn default_user_agent() -> String {
    format!("review-harvest/{}", env!("CARGO_PKG_VERSION"))
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_country() -> String {
    "us".to_string()
}
