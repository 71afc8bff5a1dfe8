//! Run statistics
//!
//! Aggregates job reports into totals and prints them at the end of a run.

use crate::output::HarvestSummary;

/// Totals across every job of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestStatistics {
    pub keywords: usize,
    pub search_seconds: i64,
    pub pages_total: usize,
    pub pages_succeeded: usize,
    pub search_records: u64,
    pub duplicates_dropped: u64,
    pub detail_targets: usize,
    pub detail_succeeded: usize,
    pub review_records: u64,
    pub failures: usize,
}

impl HarvestStatistics {
    pub fn from_summary(summary: &HarvestSummary) -> Self {
        let mut stats = Self {
            keywords: summary.jobs.len(),
            failures: summary.failure_count(),
            ..Self::default()
        };

        for job in &summary.jobs {
            stats.pages_total += job.pages_total;
            stats.pages_succeeded += job.pages_succeeded;
            stats.search_records += job.records_written;
            stats.duplicates_dropped += job.duplicates_dropped;
            stats.search_seconds += job.duration_seconds();
        }

        for job in &summary.detail_jobs {
            stats.detail_targets += job.targets_total;
            stats.detail_succeeded += job.outputs.len();
            stats.review_records += job.records_written();
            stats.duplicates_dropped += job
                .outputs
                .iter()
                .map(|o| o.duplicates_dropped)
                .sum::<u64>();
        }

        stats
    }
}

/// Prints statistics and failures to stdout in a formatted manner
pub fn print_statistics(summary: &HarvestSummary) {
    let stats = HarvestStatistics::from_summary(summary);

    println!("=== Harvest Statistics ===\n");

    println!("Search Jobs:");
    for job in &summary.jobs {
        println!(
            "  {}: {} records, {}/{} pages ({:.1}%) in {}s -> {}",
            job.keyword,
            job.records_written,
            job.pages_succeeded,
            job.pages_total,
            job.success_rate(),
            job.duration_seconds(),
            job.output.display()
        );
    }
    println!();

    if !summary.detail_jobs.is_empty() {
        println!("Detail Jobs:");
        for job in &summary.detail_jobs {
            println!(
                "  {} files, {} reviews, {}/{} targets ({:.1}%)",
                job.outputs.len(),
                job.records_written(),
                job.outputs.len(),
                job.targets_total,
                job.success_rate()
            );
        }
        println!();
    }

    println!("Totals:");
    println!("  Keywords: {}", stats.keywords);
    println!(
        "  Search pages: {}/{} ({}s)",
        stats.pages_succeeded, stats.pages_total, stats.search_seconds
    );
    println!("  Search records: {}", stats.search_records);
    println!(
        "  Detail targets: {}/{}",
        stats.detail_succeeded, stats.detail_targets
    );
    println!("  Review records: {}", stats.review_records);
    println!("  Duplicates dropped: {}", stats.duplicates_dropped);
    println!();

    if stats.failures > 0 {
        println!("Failed Items ({}):", stats.failures);
        let failures = summary
            .jobs
            .iter()
            .flat_map(|j| j.failures.iter())
            .chain(summary.detail_jobs.iter().flat_map(|j| j.failures.iter()));
        for failure in failures {
            println!("  - {}: {}", failure.item, failure.error);
        }
        println!();
    }
}
