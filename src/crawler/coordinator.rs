//! Job orchestration
//!
//! This module ties the crawler pieces together into the two job shapes:
//! - Summary jobs: every search page of a keyword feeds one shared pipeline
//! - Detail jobs: every distinct source row gets its own pipeline and file
//! - Full harvests: a summary job per keyword followed by its detail job

use crate::config::Config;
use crate::crawler::extractor::{Extractor, ReviewPageExtractor, SearchPageExtractor};
use crate::crawler::fetcher::RetryingFetcher;
use crate::crawler::scheduler::{DetailTarget, SearchPage, WorkerPool};
use crate::crawler::transport::{HttpTransport, Transport};
use crate::output::{DetailJobReport, DetailOutput, HarvestSummary, JobReport};
use crate::pipeline::Pipeline;
use crate::record::{ReviewRecord, SearchRecord, SourceRow};
use crate::storage::{output_path, read_source_rows, unique_output_path};
use crate::Result;
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Runs summary and detail jobs against a transport
pub struct JobOrchestrator {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    search_extractor: Arc<dyn Extractor<SearchRecord>>,
    review_extractor: Arc<dyn Extractor<ReviewRecord>>,
}

impl JobOrchestrator {
    /// Creates an orchestrator using the default page extractors
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Self {
            config: Arc::new(config),
            transport,
            search_extractor: Arc::new(SearchPageExtractor),
            review_extractor: Arc::new(ReviewPageExtractor),
        }
    }

    /// Creates an orchestrator fetching over HTTP as configured
    pub fn from_config(config: Config) -> Self {
        let transport = HttpTransport::new(config.transport.clone(), config.proxy.clone());
        Self::new(config, Arc::new(transport))
    }

    /// Replaces the page extractors
    pub fn with_extractors(
        mut self,
        search: Arc<dyn Extractor<SearchRecord>>,
        review: Arc<dyn Extractor<ReviewRecord>>,
    ) -> Self {
        self.search_extractor = search;
        self.review_extractor = review;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn output_dir(&self) -> PathBuf {
        PathBuf::from(&self.config.output.directory)
    }

    fn concurrency(&self) -> usize {
        self.config.crawler.max_workers as usize
    }

    /// Summary files of `keywords`, which detail outputs must never reuse
    fn summary_paths(&self, keywords: &[String]) -> HashSet<PathBuf> {
        let output_dir = self.output_dir();
        keywords
            .iter()
            .chain(self.config.keywords.iter())
            .map(|keyword| output_path(&output_dir, keyword))
            .collect()
    }

    /// Fetches `page_count` search pages for `term` into one output file
    ///
    /// All pages share one pipeline, so a product listed on several pages is
    /// written once. Pages that exhaust their retries are reported in
    /// [`JobReport::failures`] and do not stop the others.
    ///
    /// # Returns
    ///
    /// * `Ok(JobReport)` - Every page was attempted and the output closed
    /// * `Err(HarvestError)` - A write failed or the output could not be prepared
    pub async fn run_job(
        &self,
        term: &str,
        page_count: u32,
        concurrency: usize,
        max_retries: u32,
    ) -> Result<JobReport> {
        let started_at = Utc::now();
        let output_dir = self.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;

        let items = (0..page_count)
            .map(|index| SearchPage::new(&self.config.site.search_url, term, index))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let output = output_path(&output_dir, term);
        tracing::info!(
            "Starting search job for '{}': {} pages -> {}",
            term,
            page_count,
            output.display()
        );

        let pipeline = Arc::new(Pipeline::<SearchRecord>::to_csv(
            &output,
            self.config.crawler.flush_threshold,
        ));
        let fetcher = Arc::new(RetryingFetcher::new(
            Arc::clone(&self.transport),
            max_retries,
        ));
        let extractor = Arc::clone(&self.search_extractor);

        let report = {
            let pipeline = Arc::clone(&pipeline);
            WorkerPool::new(concurrency)
                .run_all(items, move |page: SearchPage| {
                    let fetcher = Arc::clone(&fetcher);
                    let extractor = Arc::clone(&extractor);
                    let pipeline = Arc::clone(&pipeline);
                    async move {
                        fetcher
                            .fetch_with_retry(&page, extractor.as_ref(), &pipeline)
                            .await
                    }
                })
                .await
        };

        let closed = pipeline.close();
        if let Some(fatal) = report.fatal {
            if let Err(e) = closed {
                tracing::error!("Failed to close {}: {}", output.display(), e);
            }
            return Err(fatal);
        }
        let stats = closed?;

        let finished_at = Utc::now();
        tracing::info!(
            "Search job for '{}' finished: {}/{} pages, {} records written",
            term,
            report.completed.len(),
            page_count,
            stats.records_written
        );

        Ok(JobReport {
            keyword: term.to_string(),
            output,
            pages_total: page_count as usize,
            pages_succeeded: report.completed.len(),
            failures: report.failed,
            records_written: stats.records_written,
            duplicates_dropped: stats.duplicates_dropped,
            flushes: stats.flushes,
            started_at,
            finished_at,
        })
    }

    /// Runs a detail job over the rows of a summary file with the configured settings
    ///
    /// No detail output is written to `path` itself.
    pub async fn run_detail_job_from(&self, path: &Path) -> Result<DetailJobReport> {
        self.detail_job_from(path, self.summary_paths(&[])).await
    }

    async fn detail_job_from(
        &self,
        path: &Path,
        mut reserved: HashSet<PathBuf>,
    ) -> Result<DetailJobReport> {
        let rows = read_source_rows(path)?;
        tracing::info!("Loaded {} source rows from {}", rows.len(), path.display());
        reserved.insert(path.to_path_buf());
        self.detail_job(
            rows,
            self.concurrency(),
            self.config.crawler.max_retries,
            reserved,
        )
        .await
    }

    /// Fetches the detail page of every row into a file per row identity
    ///
    /// Rows repeating an earlier name are skipped, so each identity owns
    /// exactly one pipeline. Identities whose file names would collide, with
    /// each other or with a configured keyword's summary file, get numbered
    /// files instead. A target's pipeline is closed whether or not its fetch
    /// succeeded.
    pub async fn run_detail_job(
        &self,
        rows: Vec<SourceRow>,
        concurrency: usize,
        max_retries: u32,
    ) -> Result<DetailJobReport> {
        self.detail_job(rows, concurrency, max_retries, self.summary_paths(&[]))
            .await
    }

    async fn detail_job(
        &self,
        rows: Vec<SourceRow>,
        concurrency: usize,
        max_retries: u32,
        reserved: HashSet<PathBuf>,
    ) -> Result<DetailJobReport> {
        let started_at = Utc::now();
        let output_dir = self.output_dir();
        tokio::fs::create_dir_all(&output_dir).await?;

        let rows_total = rows.len();
        let targets = distinct_targets(rows, &output_dir, reserved);
        if targets.len() < rows_total {
            tracing::warn!(
                "Skipped {} source rows with a repeated name",
                rows_total - targets.len()
            );
        }
        let targets_total = targets.len();
        tracing::info!("Starting detail job for {} targets", targets_total);

        let fetcher = Arc::new(RetryingFetcher::new(
            Arc::clone(&self.transport),
            max_retries,
        ));
        let extractor = Arc::clone(&self.review_extractor);
        let flush_threshold = self.config.crawler.flush_threshold;

        let report = WorkerPool::new(concurrency)
            .run_all(targets, move |target: DetailTarget| {
                let fetcher = Arc::clone(&fetcher);
                let extractor = Arc::clone(&extractor);
                async move {
                    fetch_detail(&fetcher, extractor.as_ref(), target, flush_threshold).await
                }
            })
            .await;

        if let Some(fatal) = report.fatal {
            return Err(fatal);
        }

        let finished_at = Utc::now();
        tracing::info!(
            "Detail job finished: {}/{} targets",
            report.completed.len(),
            targets_total
        );

        Ok(DetailJobReport {
            rows_total,
            targets_total,
            outputs: report.completed,
            failures: report.failed,
            started_at,
            finished_at,
        })
    }

    /// Runs the two-stage harvest for each keyword
    ///
    /// With `include_details`, each summary file that was produced feeds a
    /// detail job. A keyword whose search yielded no records has no file
    /// and no detail job.
    pub async fn harvest(
        &self,
        keywords: &[String],
        pages: u32,
        include_details: bool,
    ) -> Result<HarvestSummary> {
        let mut summary = HarvestSummary::default();
        let reserved = self.summary_paths(keywords);

        for keyword in keywords {
            let job = self
                .run_job(
                    keyword,
                    pages,
                    self.concurrency(),
                    self.config.crawler.max_retries,
                )
                .await?;

            let output = job.output.clone();
            summary.jobs.push(job);

            if !include_details {
                continue;
            }
            if !output.exists() {
                tracing::warn!("No search results for '{}', skipping details", keyword);
                continue;
            }
            summary
                .detail_jobs
                .push(self.detail_job_from(&output, reserved.clone()).await?);
        }

        Ok(summary)
    }
}

/// Fetches one detail target into its own pipeline, closing it either way
async fn fetch_detail(
    fetcher: &RetryingFetcher,
    extractor: &dyn Extractor<ReviewRecord>,
    target: DetailTarget,
    flush_threshold: usize,
) -> Result<DetailOutput> {
    let path = target.output.clone();
    let pipeline = Arc::new(Pipeline::<ReviewRecord>::to_csv(&path, flush_threshold));
    let fetched = fetcher
        .fetch_with_retry(&target, extractor, &pipeline)
        .await;
    let closed = pipeline.close();

    let fetch = match fetched {
        Ok(fetch) => fetch,
        Err(e) => {
            if let Err(close_err) = closed {
                tracing::error!("Failed to close {}: {}", path.display(), close_err);
            }
            return Err(e);
        }
    };
    let stats = closed?;

    Ok(DetailOutput {
        name: target.name,
        path,
        attempts: fetch.attempts,
        records_written: stats.records_written,
        duplicates_dropped: stats.duplicates_dropped,
    })
}

/// Collapses repeated names and gives every remaining target its own file
///
/// Paths in `reserved` are never handed out.
fn distinct_targets(
    rows: Vec<SourceRow>,
    output_dir: &Path,
    reserved: HashSet<PathBuf>,
) -> Vec<DetailTarget> {
    let mut seen = HashSet::new();
    let mut taken = reserved;
    rows.into_iter()
        .filter(|row| seen.insert(row.name.clone()))
        .map(|row| {
            let output = unique_output_path(output_dir, &row.name, &mut taken);
            if output != output_path(output_dir, &row.name) {
                tracing::warn!(
                    "Output name for '{}' is already in use, writing to {}",
                    row.name,
                    output.display()
                );
            }
            DetailTarget {
                name: row.name,
                url: row.g2_url,
                output,
            }
        })
        .collect()
}

/// Runs a complete harvest for the configured keywords
///
/// # Example
///
/// ```no_run
/// use review_harvest::config::load_config;
/// use review_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// let summary = run_harvest(config).await?;
/// println!("{} failed items", summary.failure_count());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: Config) -> Result<HarvestSummary> {
    let keywords = config.keywords.clone();
    let pages = config.crawler.pages;
    let orchestrator = JobOrchestrator::from_config(config);
    orchestrator.harvest(&keywords, pages, true).await
}
