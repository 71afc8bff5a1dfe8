//! HTML record extraction
//!
//! This module turns fetched pages into records:
//! - Product cards from search listing pages
//! - Reviews from product detail pages
//!
//! Extraction is all-or-nothing per page. A card missing a required element
//! fails the whole page so that the attempt is retried from scratch.

use crate::crawler::transport::Page;
use crate::record::{Record, ReviewRecord, SearchRecord};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

const PRODUCT_CARD: &str = "div[class='product-listing mb-1 border-bottom']";
const PRODUCT_NAME: &str = "div[class='product-listing__product-name']";
const PRODUCT_RATING: &str = "span[class='fw-semibold']";

const REVIEW_CARD: &str =
    "div[class='paper paper--white paper--box mb-2 position-relative border-bottom']";
const REVIEW_BODY: &str = "div[itemprop='reviewBody']";
const REVIEWER_NAME: &str = "a[class='link--header-color']";
const REVIEWER_TITLE: &str = "div[class='mt-4th']";
const RATING_CONTAINER: &str = "div[class='f-1 d-f ai-c mb-half-small-only']";
const TAGS_CONTAINER: &str = "div[class='tags--teal']";

/// Errors raised while extracting records from a page
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Missing element '{selector}' on {url}")]
    MissingElement { selector: String, url: String },

    #[error("Invalid selector '{0}'")]
    Selector(String),

    #[error("Invalid {field} value '{value}' on {url}")]
    InvalidValue {
        field: String,
        value: String,
        url: String,
    },
}

/// Extracts records of one shape from a page
pub trait Extractor<R: Record>: Send + Sync {
    fn extract(&self, page: &Page) -> Result<Vec<R>, ExtractError>;
}

fn selector(css: &str) -> Result<Selector, ExtractError> {
    Selector::parse(css).map_err(|_| ExtractError::Selector(css.to_string()))
}

fn text_of(element: &ElementRef) -> String {
    element.text().collect::<String>()
}

fn first<'a>(scope: &ElementRef<'a>, sel: &Selector) -> Option<ElementRef<'a>> {
    scope.select(sel).next()
}

fn missing(css: &str, page: &Page) -> ExtractError {
    ExtractError::MissingElement {
        selector: css.to_string(),
        url: page.url.clone(),
    }
}

/// Extracts [`SearchRecord`]s from a search listing page
#[derive(Debug, Default, Clone, Copy)]
pub struct SearchPageExtractor;

impl Extractor<SearchRecord> for SearchPageExtractor {
    fn extract(&self, page: &Page) -> Result<Vec<SearchRecord>, ExtractError> {
        let document = Html::parse_document(&page.body);
        let cards = selector(PRODUCT_CARD)?;
        let name_sel = selector(PRODUCT_NAME)?;
        let link_sel = selector("a")?;
        let rating_sel = selector(PRODUCT_RATING)?;
        let description_sel = selector("p")?;

        let base = Url::parse(&page.url).ok();
        let mut records = Vec::new();

        for card in document.select(&cards) {
            let name = first(&card, &name_sel).ok_or_else(|| missing(PRODUCT_NAME, page))?;

            let href = first(&name, &link_sel)
                .and_then(|a| a.value().attr("href"))
                .ok_or_else(|| missing("a[href]", page))?;
            let g2_url = match base.as_ref().and_then(|b| b.join(href).ok()) {
                Some(absolute) => absolute.to_string(),
                None => href.to_string(),
            };

            // Unrated products show no rating span.
            let stars = first(&card, &rating_sel)
                .and_then(|span| text_of(&span).trim().parse::<f64>().ok())
                .unwrap_or(0.0);

            let description = first(&card, &description_sel)
                .map(|p| text_of(&p))
                .ok_or_else(|| missing("p", page))?;

            records.push(SearchRecord::new(
                &text_of(&name),
                stars,
                &g2_url,
                &description,
            ));
        }

        Ok(records)
    }
}

/// Extracts [`ReviewRecord`]s from a product's review page
#[derive(Debug, Default, Clone, Copy)]
pub struct ReviewPageExtractor;

impl Extractor<ReviewRecord> for ReviewPageExtractor {
    fn extract(&self, page: &Page) -> Result<Vec<ReviewRecord>, ExtractError> {
        let document = Html::parse_document(&page.body);
        let cards = selector(REVIEW_CARD)?;
        let time_sel = selector("time")?;
        let body_sel = selector(REVIEW_BODY)?;
        let name_sel = selector(REVIEWER_NAME)?;
        let title_sel = selector(REVIEWER_TITLE)?;
        let rating_container_sel = selector(RATING_CONTAINER)?;
        let div_sel = selector("div")?;
        let tags_sel = selector(TAGS_CONTAINER)?;

        let mut records = Vec::new();
        let mut anonymous_count = 0;

        for card in document.select(&cards) {
            let (Some(time), Some(body)) = (first(&card, &time_sel), first(&card, &body_sel))
            else {
                continue;
            };

            let date = time.value().attr("datetime").unwrap_or_default();

            let name = match first(&card, &name_sel) {
                Some(a) => text_of(&a),
                None => {
                    let name = format!("anonymous-{}", anonymous_count);
                    anonymous_count += 1;
                    name
                }
            };

            let job_title = first(&card, &title_sel)
                .map(|div| text_of(&div))
                .unwrap_or_else(|| "n/a".to_string());

            let rating_div = first(&card, &rating_container_sel)
                .and_then(|container| first(&container, &div_sel))
                .ok_or_else(|| missing(RATING_CONTAINER, page))?;
            let rating = parse_star_class(rating_div.value().attr("class").unwrap_or_default())
                .ok_or_else(|| ExtractError::InvalidValue {
                    field: "rating".to_string(),
                    value: rating_div.value().attr("class").unwrap_or_default().to_string(),
                    url: page.url.clone(),
                })?;

            let tags_container =
                first(&card, &tags_sel).ok_or_else(|| missing(TAGS_CONTAINER, page))?;
            let tags = collect_tags(&tags_container, &div_sel);

            records.push(ReviewRecord::new(
                &name,
                date,
                &job_title,
                rating,
                &text_of(&body),
                &tags.source,
                tags.validated,
                tags.incentivized,
            ));
        }

        Ok(records)
    }
}

/// Converts a star-rating class such as `stars stars-9` to a 0-5 rating
///
/// The number after the last `-` counts half stars.
fn parse_star_class(class: &str) -> Option<f64> {
    let token = class.split_whitespace().last()?;
    let half_stars = token.rsplit('-').next()?.parse::<f64>().ok()?;
    Some(half_stars / 2.0)
}

#[derive(Debug, Default, PartialEq)]
struct ReviewTags {
    source: String,
    validated: bool,
    incentivized: bool,
}

fn collect_tags(container: &ElementRef, div_sel: &Selector) -> ReviewTags {
    let mut tags = ReviewTags::default();
    let mut seen: Vec<String> = Vec::new();

    for div in container.select(div_sel) {
        let text = text_of(&div).trim().to_string();
        if seen.contains(&text) {
            continue;
        }
        if let Some((_, source)) = text.split_once("Review source:") {
            tags.source = source.trim().to_string();
            continue;
        }
        seen.push(text);
    }

    tags.validated = seen.iter().any(|t| t == "Validated Reviewer");
    tags.incentivized = seen.iter().any(|t| t == "Incentivized Review");
    tags
}
