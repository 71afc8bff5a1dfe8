//! Record definitions for extracted data
//!
//! Every record shape declares its columns up front. The same list drives the
//! header row and the order in which each record serializes its values, so
//! nothing depends on runtime field introspection.

mod review;
mod search;

pub use review::ReviewRecord;
pub use search::{SearchRecord, SourceRow};

/// A normalized, immutable unit of extracted data
pub trait Record: Send + Sync + 'static {
    /// Column names in serialization order
    const FIELDS: &'static [&'static str];

    /// The key used for deduplication within a pipeline
    fn identity(&self) -> &str;

    /// Field values in the order given by [`Record::FIELDS`]
    fn to_row(&self) -> Vec<String>;
}

/// Normalizes a string field value
///
/// Leading and trailing whitespace is removed. A value that is empty after
/// trimming is replaced by the placeholder `"No <field>"`.
///
/// # Example
///
/// ```
/// use review_harvest::record::normalize_text;
///
/// assert_eq!(normalize_text("description", "  Fast  "), "Fast");
/// assert_eq!(normalize_text("description", "   "), "No description");
/// ```
pub fn normalize_text(field: &str, value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        format!("No {}", field)
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims() {
        assert_eq!(normalize_text("name", "\t Acme Bank \n"), "Acme Bank");
    }

    #[test]
    fn test_normalize_empty_uses_placeholder() {
        assert_eq!(normalize_text("name", ""), "No name");
        assert_eq!(normalize_text("job_title", " \n "), "No job_title");
    }

    #[test]
    fn test_normalize_keeps_inner_whitespace_and_case() {
        assert_eq!(normalize_text("name", " Acme  BANK "), "Acme  BANK");
    }
}
