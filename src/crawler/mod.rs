//! Crawler module for page fetching and record extraction
//!
//! This module contains the core harvesting logic, including:
//! - Session-scoped transports and page extractors
//! - Fetching with bounded retries
//! - A bounded worker pool over each job's work items
//! - Summary and detail job orchestration

mod coordinator;
mod extractor;
mod fetcher;
mod scheduler;
mod transport;

pub use coordinator::{run_harvest, JobOrchestrator};
pub use extractor::{ExtractError, Extractor, ReviewPageExtractor, SearchPageExtractor};
pub use fetcher::{AttemptResult, FetchReport, RetryingFetcher};
pub use scheduler::{DetailTarget, ItemFailure, PoolReport, SearchPage, WorkItem, WorkerPool};
pub use transport::{proxied_url, HttpSession, HttpTransport, Page, Session, Transport, TransportError};
