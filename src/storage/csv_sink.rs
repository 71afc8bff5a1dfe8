//! Comma-delimited file sink
//!
//! Each batch opens the destination in append mode, so rows from earlier
//! flushes (and earlier runs) are never rewritten.

use crate::storage::traits::{RecordSink, StorageError, StorageResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Appends rows to a CSV file, emitting the header only once
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// True if the destination is missing or has no content yet
    fn needs_header(&self) -> bool {
        match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        }
    }
}

impl RecordSink for CsvSink {
    fn write_rows(&mut self, header: &[&str], rows: &[Vec<String>]) -> StorageResult<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let write_header = self.needs_header();

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StorageError::io(&self.path, e))?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer
                .write_record(header)
                .map_err(|e| StorageError::csv(&self.path, e))?;
        }

        for row in rows {
            writer
                .write_record(row)
                .map_err(|e| StorageError::csv(&self.path, e))?;
        }

        writer.flush().map_err(|e| StorageError::io(&self.path, e))?;

        tracing::debug!(
            "Wrote {} rows to {} (header: {})",
            rows.len(),
            self.path.display(),
            write_header
        );

        Ok(())
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.write_rows(&["a", "b"], &[row(&["1", "2"])]).unwrap();
        sink.write_rows(&["a", "b"], &[row(&["3", "4"])]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a,b\n1,2\n3,4\n");
    }

    #[test]
    fn test_existing_empty_file_gets_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "").unwrap();

        let mut sink = CsvSink::new(&path);
        sink.write_rows(&["a"], &[row(&["x"])]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nx\n");
    }

    #[test]
    fn test_existing_content_is_appended_without_header() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "a\nold\n").unwrap();

        let mut sink = CsvSink::new(&path);
        sink.write_rows(&["a"], &[row(&["new"])]).unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nold\nnew\n");
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.write_rows(&["a"], &[]).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_values_with_delimiters_are_quoted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let mut sink = CsvSink::new(&path);

        sink.write_rows(&["text"], &[row(&["Fast, \"cheap\""])]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "text\n\"Fast, \"\"cheap\"\"\"\n");
    }

    #[test]
    fn test_unwritable_destination_reports_io_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let mut sink = CsvSink::new(&path);

        let result = sink.write_rows(&["a"], &[row(&["1"])]);
        assert!(matches!(result, Err(StorageError::Io { .. })));
    }
}
