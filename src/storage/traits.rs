//! Storage traits and error types
//!
//! This module defines the trait interface for durable record sinks and
//! associated error types.

use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error on {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn csv(path: &Path, source: csv::Error) -> Self {
        Self::Csv {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for durable record destinations
///
/// A sink receives already-serialized rows in declared column order. The
/// header is passed on every call; the sink decides whether it still needs
/// to be written.
pub trait RecordSink: Send {
    /// Durably appends `rows`, preceded by `header` if the destination is new or empty
    fn write_rows(&mut self, header: &[&str], rows: &[Vec<String>]) -> StorageResult<()>;

    /// Where this sink writes to
    fn location(&self) -> &Path;
}
