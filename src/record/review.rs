use crate::record::{normalize_text, Record};

/// A single review from a product's detail page
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    name: String,
    date: String,
    job_title: String,
    rating: f64,
    full_review: String,
    review_source: String,
    validated: bool,
    incentivized: bool,
}

impl ReviewRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: &str,
        date: &str,
        job_title: &str,
        rating: f64,
        full_review: &str,
        review_source: &str,
        validated: bool,
        incentivized: bool,
    ) -> Self {
        Self {
            name: normalize_text("name", name),
            date: normalize_text("date", date),
            job_title: normalize_text("job_title", job_title),
            rating,
            full_review: normalize_text("full_review", full_review),
            review_source: normalize_text("review_source", review_source),
            validated,
            incentivized,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> &str {
        &self.date
    }

    pub fn job_title(&self) -> &str {
        &self.job_title
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn full_review(&self) -> &str {
        &self.full_review
    }

    pub fn review_source(&self) -> &str {
        &self.review_source
    }

    pub fn validated(&self) -> bool {
        self.validated
    }

    pub fn incentivized(&self) -> bool {
        self.incentivized
    }
}

impl Record for ReviewRecord {
    const FIELDS: &'static [&'static str] = &[
        "name",
        "date",
        "job_title",
        "rating",
        "full_review",
        "review_source",
        "validated",
        "incentivized",
    ];

    fn identity(&self) -> &str {
        &self.name
    }

    fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.date.clone(),
            self.job_title.clone(),
            self.rating.to_string(),
            self.full_review.clone(),
            self.review_source.clone(),
            self.validated.to_string(),
            self.incentivized.to_string(),
        ]
    }
}
