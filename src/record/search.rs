use crate::record::{normalize_text, Record};
use serde::Deserialize;

/// A single product card from a search listing page
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRecord {
    name: String,
    stars: f64,
    g2_url: String,
    description: String,
}

impl SearchRecord {
    pub fn new(name: &str, stars: f64, g2_url: &str, description: &str) -> Self {
        Self {
            name: normalize_text("name", name),
            stars,
            g2_url: normalize_text("g2_url", g2_url),
            description: normalize_text("description", description),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stars(&self) -> f64 {
        self.stars
    }

    pub fn g2_url(&self) -> &str {
        &self.g2_url
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Record for SearchRecord {
    const FIELDS: &'static [&'static str] = &["name", "stars", "g2_url", "description"];

    fn identity(&self) -> &str {
        &self.name
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.stars.to_string(),
            self.g2_url.clone(),
            self.description.clone(),
        ]
    }
}

/// A previously written search row, as consumed by the detail job
///
/// Only the identity and the locator are needed; other columns are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceRow {
    pub name: String,
    pub g2_url: String,
}
