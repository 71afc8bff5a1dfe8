//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock HTTP servers and drive the real
//! HTTP transport and page extractors through complete jobs.

use review_harvest::config::{
    Config, CrawlerConfig, OutputConfig, ProxyConfig, SiteConfig, TransportConfig,
};
use review_harvest::crawler::JobOrchestrator;
use review_harvest::storage::read_source_rows;
use std::path::Path;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration against the given search endpoint
fn create_test_config(search_url: &str, output_dir: &Path, max_retries: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_workers: 3,
            max_retries,
            pages: 1,
            flush_threshold: 2,
        },
        site: SiteConfig {
            search_url: search_url.to_string(),
        },
        transport: TransportConfig {
            user_agent: "review-harvest-test/1.0".to_string(),
            timeout_secs: 5,
        },
        proxy: None,
        output: OutputConfig {
            directory: output_dir.display().to_string(),
        },
        keywords: vec![],
    }
}

/// Renders a search listing page with one card per `(name, href, rating)`
fn search_page(products: &[(&str, &str, &str)]) -> String {
    let cards: String = products
        .iter()
        .map(|(name, href, rating)| {
            format!(
                r#"<div class="product-listing mb-1 border-bottom">
                  <div class="product-listing__product-name"><a href="{href}">{name}</a></div>
                  <span class="fw-semibold">{rating}</span>
                  <p>About {name}</p>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

/// Renders a review page with one card per `(reviewer, half_stars, tags)`
fn review_page(reviews: &[(&str, u32, Vec<&str>)]) -> String {
    let cards: String = reviews
        .iter()
        .map(|(reviewer, half_stars, tags)| {
            let tags: String = tags.iter().map(|t| format!("<div>{}</div>", t)).collect();
            format!(
                r#"<div class="paper paper--white paper--box mb-2 position-relative border-bottom">
                  <time datetime="2024-05-01"></time>
                  <a class="link--header-color">{reviewer}</a>
                  <div class="mt-4th">Engineer</div>
                  <div class="f-1 d-f ai-c mb-half-small-only"><div class="stars large stars-{half_stars}"></div></div>
                  <div itemprop="reviewBody">Review by {reviewer}</div>
                  <div class="tags--teal">{tags}</div>
                </div>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", cards)
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

fn read_rows(path: &Path) -> (Vec<String>, Vec<Vec<String>>) {
    let mut reader = csv::Reader::from_path(path).expect("Failed to open output");
    let header = reader
        .headers()
        .expect("Failed to read header")
        .iter()
        .map(String::from)
        .collect();
    let rows = reader
        .records()
        .map(|r| r.expect("Bad row").iter().map(String::from).collect())
        .collect();
    (header, rows)
}

#[tokio::test]
async fn test_search_job_deduplicates_across_pages() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .and(query_param("query", "online bank"))
        .respond_with(html(search_page(&[
            ("Acme Bank", "/products/acme/reviews", "4.5"),
            ("Beta Bank", "/products/beta/reviews", "3.0"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .and(query_param("query", "online bank"))
        .respond_with(html(search_page(&[
            ("Beta Bank", "/products/beta/reviews", "3.0"),
            ("Gamma", "/products/gamma/reviews", "4.0"),
        ])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/search", mock_server.uri()),
        output.path(),
        1,
    );
    let orchestrator = JobOrchestrator::from_config(config);

    let report = orchestrator
        .run_job("online bank", 2, 2, 1)
        .await
        .expect("Search job failed");

    assert_eq!(report.output, output.path().join("online-bank.csv"));
    assert_eq!(report.pages_succeeded, 2);
    assert!(report.is_complete());
    assert_eq!(report.records_written, 3);
    assert_eq!(report.duplicates_dropped, 1);

    let (header, rows) = read_rows(&report.output);
    assert_eq!(header, vec!["name", "stars", "g2_url", "description"]);

    let mut names: Vec<&str> = rows.iter().map(|r| r[0].as_str()).collect();
    names.sort();
    assert_eq!(names, vec!["Acme Bank", "Beta Bank", "Gamma"]);

    let acme = rows.iter().find(|r| r[0] == "Acme Bank").unwrap();
    assert_eq!(acme[1], "4.5");
    assert_eq!(
        acme[2],
        format!("{}/products/acme/reviews", mock_server.uri())
    );
    assert_eq!(acme[3], "About Acme Bank");
}

#[tokio::test]
async fn test_search_job_retries_server_errors() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(search_page(&[(
            "Acme Bank",
            "/products/acme/reviews",
            "4.5",
        )])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/search", mock_server.uri()),
        output.path(),
        3,
    );
    let orchestrator = JobOrchestrator::from_config(config);

    let report = orchestrator
        .run_job("crm", 1, 1, 3)
        .await
        .expect("Search job failed");

    assert_eq!(report.pages_succeeded, 1);
    assert_eq!(report.records_written, 1);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_search_job_reports_exhausted_page() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "1"))
        .respond_with(html(search_page(&[(
            "Acme Bank",
            "/products/acme/reviews",
            "4.5",
        )])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/search", mock_server.uri()),
        output.path(),
        1,
    );
    let orchestrator = JobOrchestrator::from_config(config);

    let report = orchestrator
        .run_job("crm", 2, 2, 1)
        .await
        .expect("Item failures must not fail the job");

    assert_eq!(report.pages_succeeded, 1);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].item.starts_with("page 2 of 'crm'"));
    assert!(report.failures[0].error.contains("503"));
    assert_eq!(report.records_written, 1);
}

#[tokio::test]
async fn test_two_stage_harvest() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(search_page(&[
            ("Acme Bank", "/products/acme/reviews", "4.5"),
            ("Beta", "/products/beta/reviews", "3.5"),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products/acme/reviews"))
        .respond_with(html(review_page(&[
            (
                "Jane D.",
                9,
                vec!["Validated Reviewer", "Review source: Organic"],
            ),
            ("Omar K.", 6, vec!["Incentivized Review"]),
        ])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/products/beta/reviews"))
        .respond_with(html(review_page(&[(
            "Li W.",
            10,
            vec!["Review source: Seller invite"],
        )])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/search", mock_server.uri()),
        output.path(),
        1,
    );
    let orchestrator = JobOrchestrator::from_config(config);

    let summary = orchestrator
        .harvest(&["crm".to_string()], 1, true)
        .await
        .expect("Harvest failed");

    assert_eq!(summary.failure_count(), 0);
    assert_eq!(summary.jobs[0].records_written, 2);

    let detail = &summary.detail_jobs[0];
    assert_eq!(detail.targets_total, 2);
    assert_eq!(detail.records_written(), 3);

    let sources = read_source_rows(&output.path().join("crm.csv")).unwrap();
    assert_eq!(sources.len(), 2);

    let (header, rows) = read_rows(&output.path().join("Acme-Bank.csv"));
    assert_eq!(
        header,
        vec![
            "name",
            "date",
            "job_title",
            "rating",
            "full_review",
            "review_source",
            "validated",
            "incentivized"
        ]
    );
    let jane = rows.iter().find(|r| r[0] == "Jane D.").unwrap();
    assert_eq!(
        jane,
        &vec![
            "Jane D.",
            "2024-05-01",
            "Engineer",
            "4.5",
            "Review by Jane D.",
            "Organic",
            "true",
            "false"
        ]
    );
    let omar = rows.iter().find(|r| r[0] == "Omar K.").unwrap();
    assert_eq!(omar[3], "3");
    assert_eq!(omar[5], "No review_source");
    assert_eq!(omar[7], "true");

    let (_, beta_rows) = read_rows(&output.path().join("Beta.csv"));
    assert_eq!(beta_rows.len(), 1);
    assert_eq!(beta_rows[0][5], "Seller invite");
}

#[tokio::test]
async fn test_rerun_appends_without_second_header() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(html(search_page(&[(
            "Acme Bank",
            "/products/acme/reviews",
            "4.5",
        )])))
        .mount(&mock_server)
        .await;

    let config = create_test_config(
        &format!("{}/search", mock_server.uri()),
        output.path(),
        0,
    );
    let orchestrator = JobOrchestrator::from_config(config);

    orchestrator.run_job("crm", 1, 1, 0).await.unwrap();
    let report = orchestrator.run_job("crm", 1, 1, 0).await.unwrap();

    let content = std::fs::read_to_string(&report.output).unwrap();
    assert_eq!(content.matches("name,stars,g2_url,description").count(), 1);
    assert_eq!(content.lines().count(), 3);
}

#[tokio::test]
async fn test_fetches_through_proxy() {
    let mock_server = MockServer::start().await;
    let output = TempDir::new().unwrap();

    Mock::given(method("GET"))
        .and(path("/v1/"))
        .and(query_param("api_key", "secret"))
        .and(query_param(
            "url",
            "https://www.g2.com/search?page=1&query=crm",
        ))
        .and(query_param("country", "us"))
        .respond_with(html(search_page(&[(
            "Acme Bank",
            "/products/acme/reviews",
            "4.5",
        )])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config("https://www.g2.com/search", output.path(), 0);
    config.proxy = Some(ProxyConfig {
        endpoint: format!("{}/v1/", mock_server.uri()),
        api_key: "secret".to_string(),
        country: "us".to_string(),
    });
    let orchestrator = JobOrchestrator::from_config(config);

    let report = orchestrator.run_job("crm", 1, 1, 0).await.unwrap();
    assert!(report.is_complete());

    let sources = read_source_rows(&report.output).unwrap();
    assert_eq!(
        sources[0].g2_url,
        "https://www.g2.com/products/acme/reviews"
    );
}
