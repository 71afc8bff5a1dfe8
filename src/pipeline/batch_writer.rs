//! Buffered, batched writes to a record sink
//!
//! Records accumulate in memory until the configured threshold is reached,
//! at which point the buffer is swapped for an empty one and the swapped-out
//! batch is written. Appends that arrive while a batch is being written land
//! in the fresh buffer.

use crate::pipeline::lock;
use crate::record::Record;
use crate::storage::RecordSink;
use crate::{HarvestError, Result};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;

/// Buffers records and flushes them to a sink in batches
pub struct BatchWriter<R: Record> {
    /// Records waiting to be written
    buffer: Mutex<Vec<R>>,

    /// Destination; holding this lock serializes swap + write so batches
    /// reach the sink in the order they were swapped out
    sink: Mutex<Box<dyn RecordSink>>,

    /// Buffer length that triggers an automatic flush
    threshold: usize,

    /// Set while an automatic flush is running
    flushing: AtomicBool,

    closed: AtomicBool,
    written: AtomicU64,
    flushes: AtomicU64,
    location: PathBuf,
}

impl<R: Record> BatchWriter<R> {
    /// Creates a writer over `sink` that flushes every `threshold` records
    ///
    /// A threshold of zero is treated as one.
    pub fn new(sink: Box<dyn RecordSink>, threshold: usize) -> Self {
        let location = sink.location().to_path_buf();
        Self {
            buffer: Mutex::new(Vec::new()),
            sink: Mutex::new(sink),
            threshold: threshold.max(1),
            flushing: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            written: AtomicU64::new(0),
            flushes: AtomicU64::new(0),
            location,
        }
    }

    /// Adds a record, flushing automatically once the threshold is reached
    pub fn append(&self, record: R) -> Result<()> {
        if self.push(record)? {
            self.finish_auto_flush()?;
        }
        Ok(())
    }

    /// Buffers a record without writing
    ///
    /// Returns true if the buffer reached the threshold and this caller won
    /// the right to run the automatic flush; it must then call
    /// [`finish_auto_flush`](Self::finish_auto_flush).
    pub(crate) fn push(&self, record: R) -> Result<bool> {
        let mut buffer = lock(&self.buffer);
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        buffer.push(record);

        let claimed = buffer.len() >= self.threshold
            && self
                .flushing
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_ok();
        Ok(claimed)
    }

    /// Runs a claimed automatic flush and releases the busy flag
    pub(crate) fn finish_auto_flush(&self) -> Result<()> {
        let result = self.write_pending();
        self.flushing.store(false, Ordering::Release);
        result
    }

    /// Writes every buffered record to the sink
    ///
    /// A no-op if nothing is buffered. On error the swapped-out batch is lost.
    pub fn flush(&self) -> Result<()> {
        self.write_pending()
    }

    /// Flushes any remaining records and rejects further appends
    ///
    /// Calling `close` more than once is harmless.
    pub fn close(&self) -> Result<()> {
        self.mark_closed();
        self.write_pending()
    }

    /// Rejects further appends without writing anything
    pub(crate) fn mark_closed(&self) {
        let _buffer = lock(&self.buffer);
        self.closed.store(true, Ordering::Release);
    }

    fn write_pending(&self) -> Result<()> {
        let mut sink = lock(&self.sink);
        let batch = std::mem::take(&mut *lock(&self.buffer));
        if batch.is_empty() {
            return Ok(());
        }

        let rows: Vec<Vec<String>> = batch.iter().map(R::to_row).collect();
        if let Err(e) = sink.write_rows(R::FIELDS, &rows) {
            tracing::error!(
                "Failed to write {} records to {}: {}",
                rows.len(),
                self.location.display(),
                e
            );
            return Err(e.into());
        }

        self.written.fetch_add(rows.len() as u64, Ordering::Relaxed);
        self.flushes.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            "Flushed {} records to {}",
            rows.len(),
            self.location.display()
        );
        Ok(())
    }

    fn closed_error(&self) -> HarvestError {
        HarvestError::PipelineClosed(self.location.display().to_string())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of records currently buffered
    pub fn buffered(&self) -> usize {
        lock(&self.buffer).len()
    }

    /// Number of records durably written
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }

    /// Number of non-empty batches written
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    pub fn location(&self) -> &Path {
        &self.location
    }
}
