//! Retrying fetcher
//!
//! This module wraps one fetch + extract of a work item in a bounded retry
//! policy:
//! - Every attempt opens its own transport session and always closes it
//! - An attempt succeeds only if the fetch and the full extraction succeed
//! - Records reach the pipeline only from a successful attempt

use crate::crawler::extractor::Extractor;
use crate::crawler::scheduler::WorkItem;
use crate::crawler::transport::Transport;
use crate::pipeline::Pipeline;
use crate::record::Record;
use crate::{HarvestError, Result};
use std::sync::Arc;

/// Result of a single fetch attempt
#[derive(Debug)]
pub enum AttemptResult<R> {
    /// Page fetched and fully extracted
    Success {
        /// Records in extraction order
        records: Vec<R>,
    },

    /// Session could not be opened or the fetch failed
    TransportFailed {
        /// Error description
        error: String,
    },

    /// Page fetched but extraction failed
    ExtractFailed {
        /// Error description
        error: String,
    },
}

/// Summary of a work item that completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchReport {
    /// Attempts used, including the successful one
    pub attempts: u32,

    /// Records produced by the successful attempt
    pub extracted: usize,

    /// Records admitted by the pipeline (the rest were duplicates)
    pub admitted: usize,
}

/// Fetches work items with a bounded number of retries
pub struct RetryingFetcher {
    transport: Arc<dyn Transport>,
    max_retries: u32,
}

impl RetryingFetcher {
    /// Creates a fetcher allowing `max_retries` retries after the first attempt
    pub fn new(transport: Arc<dyn Transport>, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries,
        }
    }

    /// Total attempts allowed per item
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Performs one attempt on a fresh session
    ///
    /// The session is closed before returning, whatever the outcome.
    pub async fn fetch_once<W, R, E>(&self, item: &W, extractor: &E) -> AttemptResult<R>
    where
        W: WorkItem,
        R: Record,
        E: Extractor<R> + ?Sized,
    {
        let url = item.locator();

        let mut session = match self.transport.open_session().await {
            Ok(session) => session,
            Err(e) => {
                return AttemptResult::TransportFailed {
                    error: e.to_string(),
                }
            }
        };

        let result = match session.fetch(url).await {
            Ok(page) => {
                tracing::info!("Fetched {}", url);
                match extractor.extract(&page) {
                    Ok(records) => AttemptResult::Success { records },
                    Err(e) => AttemptResult::ExtractFailed {
                        error: e.to_string(),
                    },
                }
            }
            Err(e) => AttemptResult::TransportFailed {
                error: e.to_string(),
            },
        };

        session.close().await;
        result
    }

    /// Fetches `item` until an attempt succeeds or attempts run out
    ///
    /// Records from the successful attempt are submitted to `pipeline` in
    /// extraction order on the blocking pool, since a submission may flush to
    /// disk. A pipeline error is returned at once without retry.
    ///
    /// # Returns
    ///
    /// * `Ok(FetchReport)` - The item completed
    /// * `Err(HarvestError::RetriesExhausted)` - Every attempt failed
    /// * `Err(HarvestError)` - The pipeline failed to accept or write a record
    pub async fn fetch_with_retry<W, R, E>(
        &self,
        item: &W,
        extractor: &E,
        pipeline: &Arc<Pipeline<R>>,
    ) -> Result<FetchReport>
    where
        W: WorkItem,
        R: Record,
        E: Extractor<R> + ?Sized,
    {
        let max_attempts = self.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            match self.fetch_once(item, extractor).await {
                AttemptResult::Success { records } => {
                    let extracted = records.len();
                    let admitted = submit_blocking(pipeline, records).await?;
                    tracing::info!(
                        "Successfully parsed {} records from {} (attempt {})",
                        extracted,
                        item,
                        attempt
                    );
                    return Ok(FetchReport {
                        attempts: attempt,
                        extracted,
                        admitted,
                    });
                }
                AttemptResult::TransportFailed { error } | AttemptResult::ExtractFailed { error } => {
                    tracing::warn!(
                        "Attempt {}/{} failed for {}: {}",
                        attempt,
                        max_attempts,
                        item,
                        error
                    );
                    if attempt < max_attempts {
                        tracing::info!(
                            "Retrying {}, retries left {}",
                            item,
                            max_attempts - attempt
                        );
                    }
                    last_error = error;
                }
            }
        }

        tracing::error!("Max retries exceeded for {}", item);
        Err(HarvestError::RetriesExhausted {
            item: item.to_string(),
            attempts: max_attempts,
            last_error,
        })
    }
}

/// Submits `records` from a blocking-pool thread
async fn submit_blocking<R: Record>(pipeline: &Arc<Pipeline<R>>, records: Vec<R>) -> Result<usize> {
    let pipeline = Arc::clone(pipeline);
    tokio::task::spawn_blocking(move || pipeline.submit_all(records))
        .await
        .map_err(|e| HarvestError::Join(e.to_string()))?
}
