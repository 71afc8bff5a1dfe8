//! Storage module for persisting extracted records
//!
//! This module handles:
//! - Appending serialized rows to delimited files
//! - Reading a previous job's rows back as detail-job input
//! - Deriving output file names from job identities

mod csv_sink;
mod traits;

pub use csv_sink::CsvSink;
pub use traits::{RecordSink, StorageError, StorageResult};

use crate::record::SourceRow;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Builds the output path for a job or sub-job identity
///
/// Spaces and path separators become `-` so every identity maps to a single
/// file directly inside `directory`.
///
/// # Example
///
/// ```
/// use review_harvest::storage::output_path;
/// use std::path::Path;
///
/// let path = output_path(Path::new("out"), "online bank");
/// assert_eq!(path, Path::new("out").join("online-bank.csv"));
/// ```
pub fn output_path(directory: &Path, identity: &str) -> PathBuf {
    let stem: String = identity
        .trim()
        .chars()
        .map(|c| match c {
            ' ' | '/' | '\\' => '-',
            c => c,
        })
        .collect();
    directory.join(format!("{}.csv", stem))
}

/// Builds an output path that no earlier identity in `taken` already owns
///
/// Identities that map to the same file name get `-2`, `-3`, ... appended in
/// call order. The returned path is added to `taken`.
///
/// # Example
///
/// ```
/// use review_harvest::storage::unique_output_path;
/// use std::collections::HashSet;
/// use std::path::Path;
///
/// let dir = Path::new("out");
/// let mut taken = HashSet::new();
/// assert_eq!(unique_output_path(dir, "Acme Bank", &mut taken), dir.join("Acme-Bank.csv"));
/// assert_eq!(unique_output_path(dir, "Acme-Bank", &mut taken), dir.join("Acme-Bank-2.csv"));
/// ```
pub fn unique_output_path(
    directory: &Path,
    identity: &str,
    taken: &mut HashSet<PathBuf>,
) -> PathBuf {
    let mut path = output_path(directory, identity);
    let mut suffix = 2;
    while taken.contains(&path) {
        path = output_path(directory, &format!("{}-{}", identity.trim(), suffix));
        suffix += 1;
    }
    taken.insert(path.clone());
    path
}

/// Reads the rows of a previously written search file
///
/// # Arguments
///
/// * `path` - A file produced by the summary job
///
/// # Returns
///
/// * `Ok(Vec<SourceRow>)` - Rows in file order
/// * `Err(StorageError)` - The file could not be read or lacks the needed columns
pub fn read_source_rows(path: &Path) -> StorageResult<Vec<SourceRow>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| StorageError::csv(path, e))?;

    reader
        .deserialize()
        .map(|row| row.map_err(|e| StorageError::csv(path, e)))
        .collect()
}
