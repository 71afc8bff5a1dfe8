//! Record pipeline: deduplication feeding a batch writer
//!
//! A [`Pipeline`] owns one output stream. It is shared by every worker of a
//! job, and each submitted record passes through the deduplicator and into
//! the batch writer as one atomic step.

mod batch_writer;
mod dedup;

pub use batch_writer::BatchWriter;
pub use dedup::Deduplicator;

use crate::record::Record;
use crate::storage::{CsvSink, RecordSink};
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a mutex, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counters describing a pipeline's lifetime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub admitted: u64,
    pub duplicates_dropped: u64,
    pub records_written: u64,
    pub flushes: u64,
}

/// Deduplicating, batched, thread-safe record pipeline
pub struct Pipeline<R: Record> {
    dedup: Mutex<Deduplicator>,
    writer: BatchWriter<R>,
}

impl<R: Record> Pipeline<R> {
    /// Creates a pipeline writing to an arbitrary sink
    pub fn new(sink: Box<dyn RecordSink>, flush_threshold: usize) -> Self {
        Self {
            dedup: Mutex::new(Deduplicator::new()),
            writer: BatchWriter::new(sink, flush_threshold),
        }
    }

    /// Creates a pipeline appending to a CSV file at `path`
    pub fn to_csv(path: impl Into<PathBuf>, flush_threshold: usize) -> Self {
        Self::new(Box::new(CsvSink::new(path)), flush_threshold)
    }

    /// Submits one record
    ///
    /// The duplicate check and the buffer append happen under one lock, so
    /// two workers can never both admit the same identity key. A flush
    /// triggered by this record runs after that lock is released.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The record was admitted
    /// * `Ok(false)` - The record was a duplicate and was dropped
    /// * `Err(HarvestError)` - The pipeline is closed or an automatic flush failed
    pub fn submit(&self, record: R) -> Result<bool> {
        let claimed_flush = {
            let mut dedup = lock(&self.dedup);
            if self.writer.is_closed() {
                return Err(crate::HarvestError::PipelineClosed(
                    self.writer.location().display().to_string(),
                ));
            }
            if !dedup.admit(&record) {
                return Ok(false);
            }
            self.writer.push(record)?
        };

        if claimed_flush {
            self.writer.finish_auto_flush()?;
        }
        Ok(true)
    }

    /// Submits a page's records in order, returning how many were admitted
    ///
    /// Stops at the first error; records before it stay admitted.
    pub fn submit_all(&self, records: Vec<R>) -> Result<usize> {
        let mut admitted = 0;
        for record in records {
            if self.submit(record)? {
                admitted += 1;
            }
        }
        Ok(admitted)
    }

    /// Writes all buffered records now
    pub fn flush(&self) -> Result<()> {
        self.writer.flush()
    }

    /// Performs the final flush and closes the pipeline
    ///
    /// The writer is marked closed under the dedup lock, so a record is
    /// either admitted and buffered before the final flush or rejected
    /// with its key left unseen.
    pub fn close(&self) -> Result<PipelineStats> {
        {
            let _dedup = lock(&self.dedup);
            self.writer.mark_closed();
        }
        self.writer.close()?;
        let stats = self.stats();
        tracing::info!(
            "Closed pipeline {}: {} written, {} duplicates dropped",
            self.location().display(),
            stats.records_written,
            stats.duplicates_dropped
        );
        Ok(stats)
    }

    pub fn stats(&self) -> PipelineStats {
        let dedup = lock(&self.dedup);
        PipelineStats {
            admitted: dedup.seen_count() as u64,
            duplicates_dropped: dedup.dropped(),
            records_written: self.writer.written(),
            flushes: self.writer.flushes(),
        }
    }

    pub fn location(&self) -> &Path {
        self.writer.location()
    }
}
