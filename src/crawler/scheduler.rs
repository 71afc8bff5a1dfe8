//! Bounded worker pool for fetch work items
//!
//! This module handles:
//! - The work item types (search pages and detail targets)
//! - Enqueuing every item of a job up front
//! - Running at most `limit` fetches at a time
//! - Isolating item failures from each other
//! - Stopping early when a job-fatal error occurs

use crate::HarvestError;
use std::fmt;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use url::Url;

/// A unit of fetch work
pub trait WorkItem: fmt::Display + Send + Sync + 'static {
    /// The URL this item fetches
    fn locator(&self) -> &str;
}

/// One page of search results for a keyword
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchPage {
    pub keyword: String,

    /// Zero-based page index; the site's page numbers start at 1
    pub page_index: u32,

    url: String,
}

impl SearchPage {
    /// Builds the item for `page_index` of `keyword` against `search_url`
    ///
    /// # Example
    ///
    /// ```
    /// use review_harvest::crawler::{SearchPage, WorkItem};
    ///
    /// let page = SearchPage::new("https://www.g2.com/search", "online bank", 0).unwrap();
    /// assert_eq!(page.locator(), "https://www.g2.com/search?page=1&query=online+bank");
    /// ```
    pub fn new(search_url: &str, keyword: &str, page_index: u32) -> Result<Self, url::ParseError> {
        let url = Url::parse_with_params(
            search_url,
            &[
                ("page", (page_index + 1).to_string()),
                ("query", keyword.to_string()),
            ],
        )?;

        Ok(Self {
            keyword: keyword.to_string(),
            page_index,
            url: url.into(),
        })
    }
}

impl WorkItem for SearchPage {
    fn locator(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for SearchPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {} of '{}' ({})", self.page_index + 1, self.keyword, self.url)
    }
}

/// A product detail page derived from a previously written search row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTarget {
    pub name: String,
    pub url: String,

    /// File this target's records are written to; unique within a job
    pub output: PathBuf,
}

impl WorkItem for DetailTarget {
    fn locator(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for DetailTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// A work item that did not complete
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemFailure {
    /// Display label of the item
    pub item: String,

    /// Final error message
    pub error: String,
}

/// Outcome of running a pool over a job's items
#[derive(Debug)]
pub struct PoolReport<T> {
    /// Results of items that succeeded, in completion order
    pub completed: Vec<T>,

    /// Items that failed without affecting the rest of the job
    pub failed: Vec<ItemFailure>,

    /// First job-fatal error, if any; no new items start once one occurs
    pub fatal: Option<HarvestError>,

    /// Items never started because of a fatal error
    pub skipped: usize,
}

impl<T> Default for PoolReport<T> {
    fn default() -> Self {
        Self {
            completed: Vec::new(),
            failed: Vec::new(),
            fatal: None,
            skipped: 0,
        }
    }
}

/// Runs fetches concurrently with a fixed upper bound
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    limit: usize,
}

impl WorkerPool {
    /// Creates a pool running at most `limit` items at once (minimum 1)
    pub fn new(limit: usize) -> Self {
        Self {
            limit: limit.max(1),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Runs `fetch` for every item and waits for all of them
    ///
    /// Items are queued up front and pulled by `limit` worker tasks, so
    /// completion order is unspecified. A failing or panicking item is
    /// recorded in [`PoolReport::failed`] and never cancels its siblings. An
    /// error for which [`HarvestError::is_fatal`] holds stops workers from
    /// taking further items; fetches already in flight still finish.
    pub async fn run_all<W, T, F, Fut>(&self, items: Vec<W>, fetch: F) -> PoolReport<T>
    where
        W: WorkItem,
        T: Send + 'static,
        F: Fn(W) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = crate::Result<T>> + Send + 'static,
    {
        let total = items.len();
        let workers = self.limit.min(total);
        tracing::info!("Processing {} work items with {} workers", total, workers);

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        for item in items {
            if queue_tx.send(item).is_err() {
                break;
            }
        }
        drop(queue_tx);

        let queue = Arc::new(Mutex::new(queue_rx));
        let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
        let fetch = Arc::new(fetch);
        let abort = Arc::new(AtomicBool::new(false));

        let mut join_set = JoinSet::new();
        for worker_id in 0..workers {
            let queue = Arc::clone(&queue);
            let outcome_tx = outcome_tx.clone();
            let fetch = Arc::clone(&fetch);
            let abort = Arc::clone(&abort);

            join_set.spawn(async move {
                loop {
                    if abort.load(Ordering::Acquire) {
                        break;
                    }
                    let next = queue.lock().await.recv().await;
                    let Some(item) = next else {
                        break;
                    };

                    let label = item.to_string();
                    tracing::debug!("Worker {} picked up {}", worker_id, label);

                    // Run the item in its own task so a panic is confined to it.
                    let result = match tokio::spawn(fetch(item)).await {
                        Ok(result) => result,
                        Err(e) => Err(HarvestError::Join(e.to_string())),
                    };

                    if let Err(e) = &result {
                        if e.is_fatal() {
                            abort.store(true, Ordering::Release);
                        }
                    }
                    if outcome_tx.send((label, result)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(outcome_tx);

        while let Some(joined) = join_set.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task failed: {}", e);
            }
        }

        let mut report = PoolReport::default();
        let mut processed = 0;
        while let Some((label, result)) = outcome_rx.recv().await {
            processed += 1;
            match result {
                Ok(value) => report.completed.push(value),
                Err(e) if e.is_fatal() => {
                    tracing::error!("Fatal error while processing {}: {}", label, e);
                    if report.fatal.is_none() {
                        report.fatal = Some(e);
                    } else {
                        report.failed.push(ItemFailure {
                            item: label,
                            error: e.to_string(),
                        });
                    }
                }
                Err(e) => {
                    tracing::error!("Permanently failed {}: {}", label, e);
                    report.failed.push(ItemFailure {
                        item: label,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.skipped = total - processed;

        if report.skipped > 0 {
            tracing::warn!("{} work items skipped after a fatal error", report.skipped);
        }

        report
    }
}
