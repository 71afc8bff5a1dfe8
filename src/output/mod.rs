//! Output module for job reports
//!
//! This module handles:
//! - Describing what each summary and detail job produced
//! - Collecting the failures a job reports instead of aborting
//! - Printing run statistics

pub mod stats;

pub use stats::{print_statistics, HarvestStatistics};

use crate::crawler::ItemFailure;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Result of a summary (search listing) job
#[derive(Debug, Clone)]
pub struct JobReport {
    pub keyword: String,

    /// The delimited file the job's records were appended to
    pub output: PathBuf,

    pub pages_total: usize,
    pub pages_succeeded: usize,

    /// Pages that exhausted their retries
    pub failures: Vec<ItemFailure>,

    pub records_written: u64,
    pub duplicates_dropped: u64,
    pub flushes: u64,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl JobReport {
    /// True if every page was processed
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the page success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.pages_total == 0 {
            return 0.0;
        }
        (self.pages_succeeded as f64 / self.pages_total as f64) * 100.0
    }

    pub fn duration_seconds(&self) -> i64 {
        (self.finished_at - self.started_at).num_seconds()
    }
}

/// One detail page's output file
#[derive(Debug, Clone, PartialEq)]
pub struct DetailOutput {
    pub name: String,
    pub path: PathBuf,
    pub attempts: u32,
    pub records_written: u64,
    pub duplicates_dropped: u64,
}

/// Result of a detail (review) job
#[derive(Debug, Clone)]
pub struct DetailJobReport {
    /// Rows received, before collapsing repeated identities
    pub rows_total: usize,

    /// Distinct identities scheduled
    pub targets_total: usize,

    /// One entry per identity that completed
    pub outputs: Vec<DetailOutput>,

    /// Identities whose page exhausted its retries
    pub failures: Vec<ItemFailure>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl DetailJobReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn records_written(&self) -> u64 {
        self.outputs.iter().map(|o| o.records_written).sum()
    }

    /// Returns the target success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.targets_total == 0 {
            return 0.0;
        }
        (self.outputs.len() as f64 / self.targets_total as f64) * 100.0
    }
}

/// Everything a full two-stage run produced
#[derive(Debug, Clone, Default)]
pub struct HarvestSummary {
    pub jobs: Vec<JobReport>,
    pub detail_jobs: Vec<DetailJobReport>,
}

impl HarvestSummary {
    /// Total failed items across every job
    pub fn failure_count(&self) -> usize {
        self.jobs.iter().map(|j| j.failures.len()).sum::<usize>()
            + self
                .detail_jobs
                .iter()
                .map(|j| j.failures.len())
                .sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(total: usize, succeeded: usize) -> JobReport {
        let now = Utc::now();
        JobReport {
            keyword: "crm".to_string(),
            output: PathBuf::from("crm.csv"),
            pages_total: total,
            pages_succeeded: succeeded,
            failures: (succeeded..total)
                .map(|i| ItemFailure {
                    item: format!("page {}", i + 1),
                    error: "timeout".to_string(),
                })
                .collect(),
            records_written: 0,
            duplicates_dropped: 0,
            flushes: 0,
            started_at: now,
            finished_at: now,
        }
    }

    #[test]
    fn test_success_rate() {
        let report = job(4, 3);
        assert!((report.success_rate() - 75.0).abs() < 0.01);
        assert!(!report.is_complete());
    }

    #[test]
    fn test_success_rate_zero_pages() {
        assert_eq!(job(0, 0).success_rate(), 0.0);
    }

    #[test]
    fn test_failure_count_spans_jobs() {
        let summary = HarvestSummary {
            jobs: vec![job(3, 1), job(2, 2)],
            detail_jobs: vec![],
        };
        assert_eq!(summary.failure_count(), 2);
    }
}
