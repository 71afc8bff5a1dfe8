//! Review-Harvest: a concurrent listing and review harvester
//!
//! This crate fetches paginated search listings and per-product review pages,
//! extracts structured records from them, and persists those records to
//! delimited files through a deduplicating, batched pipeline.

pub mod config;
pub mod crawler;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod storage;

use thiserror::Error;

/// Main error type for Review-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Transport error: {0}")]
    Transport(#[from] crawler::TransportError),

    #[error("Extraction error: {0}")]
    Extract(#[from] crawler::ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Pipeline for {0} is already closed")]
    PipelineClosed(String),

    #[error("Max retries exceeded for {item} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        item: String,
        attempts: u32,
        last_error: String,
    },

    #[error("Worker task failed: {0}")]
    Join(String),
}

impl HarvestError {
    /// Returns true if this error must abort the whole job
    ///
    /// Durable-write failures are fatal; anything scoped to a single work item
    /// is isolated and merely reported.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Storage(_) | Self::Io(_) | Self::PipelineClosed(_)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Review-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{JobOrchestrator, RetryingFetcher, WorkerPool};
pub use pipeline::Pipeline;
pub use record::{Record, ReviewRecord, SearchRecord};
