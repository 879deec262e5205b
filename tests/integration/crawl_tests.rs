//! Integration tests for the crawler and scrape tools
//!
//! These tests use wiremock to create mock HTTP servers and exercise the
//! full fetch, store and report cycle end-to-end.

use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use webscrape::config::Config;
use webscrape::output::format_crawl_summary;
use webscrape::render::UnavailableRenderer;
use webscrape::state::PageState;
use webscrape::store::{MemoryStore, ResourceStore, SqliteStore};
use webscrape::tools::{CrawlSiteParams, ResourceContent, ScrapeUrlParams};
use webscrape::{ResponseFormat, ScrapeService};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration with a small worker pool
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.crawler.workers = 3;
    config.crawler.request_timeout_secs = 5;
    config.user_agent.crawler_name = "TestBot".to_string();
    config
}

fn memory_store() -> Arc<dyn ResourceStore> {
    Arc::new(MemoryStore::new(chrono::Duration::seconds(3600)))
}

fn create_service(store: Arc<dyn ResourceStore>) -> ScrapeService {
    ScrapeService::new(
        create_test_config(),
        store,
        Arc::new(UnavailableRenderer::new("no browser in tests")),
    )
    .expect("Failed to build service")
}

async fn mount_page(server: &MockServer, route: &str, title: &str, links: &[&str]) {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(format!(
                    "<html><head><title>{}</title></head><body><p>{} body</p>{}</body></html>",
                    title, title, anchors
                ))
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

fn crawl_params(base_url: &str, max_depth: u32, max_pages: usize) -> CrawlSiteParams {
    CrawlSiteParams {
        max_depth,
        max_pages,
        ..CrawlSiteParams::new(format!("{}/", base_url))
    }
}

#[tokio::test]
async fn test_crawl_same_domain_depth_one() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "Home", &["/a", "/b", "https://other.test/x"]).await;
    mount_page(&mock_server, "/a", "A", &["/c"]).await;
    mount_page(&mock_server, "/b", "B", &["/"]).await;
    mount_page(&mock_server, "/c", "C", &[]).await;

    let service = create_service(memory_store());
    let report = service
        .crawl_site(crawl_params(&base_url, 1, 5), CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(report.success);
    assert!(!report.cancelled);
    assert_eq!(report.pages_crawled, 3);
    assert_eq!(report.pages_failed, 0);

    let urls: Vec<String> = report.results.iter().map(|r| r.url.clone()).collect();
    assert_eq!(
        urls,
        vec![
            format!("{}/", base_url),
            format!("{}/a", base_url),
            format!("{}/b", base_url)
        ]
    );

    let root = &report.results[0];
    assert_eq!(root.depth, 0);
    assert_eq!(root.status_code, Some(200));
    assert_eq!(root.title.as_deref(), Some("Home"));
    assert_eq!(root.internal_links, 2);
    assert_eq!(root.external_links, 1);
    assert!(report.results.iter().all(|r| r.depth <= 1));

    // Every page is retrievable from the shared store
    for record in &report.results {
        let uri = record.resource_uri.as_deref().expect("missing resource URI");
        match service.get_resource(uri).expect("resource missing") {
            ResourceContent::Content { bytes, .. } => {
                assert_eq!(Some(bytes.len()), record.content_length);
            }
            other => panic!("expected content, got {:?}", other),
        }
    }
}

#[tokio::test]
async fn test_crawl_dead_link_does_not_fail_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "Home", &["/exists", "/missing"]).await;
    mount_page(&mock_server, "/exists", "Exists", &[]).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let service = create_service(memory_store());
    let report = service
        .crawl_site(crawl_params(&base_url, 2, 20), CancellationToken::new())
        .await
        .expect("Crawl failed");

    assert!(report.success);
    assert_eq!(report.pages_crawled, 3);
    assert_eq!(report.pages_failed, 1);

    let missing = report
        .results
        .iter()
        .find(|r| r.url.ends_with("/missing"))
        .expect("missing page not recorded");
    assert!(!missing.success);
    assert_eq!(missing.status_code, Some(404));
    assert_eq!(missing.state, PageState::DeadLink);
    assert!(missing.resource_uri.is_none());
    assert!(missing.error.is_some());

    let summary = format_crawl_summary(&report);
    assert!(summary.contains("| dead_link | 1 |"));
}

#[tokio::test]
async fn test_crawl_unreachable_start_fails_report() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = create_service(memory_store());
    let report = service
        .crawl_site(
            crawl_params(&mock_server.uri(), 2, 20),
            CancellationToken::new(),
        )
        .await
        .expect("Crawl returned an error instead of a report");

    assert!(!report.success);
    assert_eq!(report.pages_crawled, 1);
    assert_eq!(report.results[0].state, PageState::HttpError);
}

#[tokio::test]
async fn test_crawl_page_budget() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let links: Vec<String> = (0..50).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    mount_page(&mock_server, "/", "Home", &link_refs).await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>leaf</body></html>")
                .insert_header("content-type", "text/html"),
        )
        .mount(&mock_server)
        .await;

    let service = create_service(memory_store());

    let single = service
        .crawl_site(crawl_params(&base_url, 3, 1), CancellationToken::new())
        .await
        .expect("Crawl failed");
    assert_eq!(single.pages_crawled, 1);
    assert_eq!(single.results[0].internal_links, 50);

    let bounded = service
        .crawl_site(crawl_params(&base_url, 3, 7), CancellationToken::new())
        .await
        .expect("Crawl failed");
    assert_eq!(bounded.pages_crawled, 7);
    let expected: Vec<String> = std::iter::once(format!("{}/", base_url))
        .chain((0..6).map(|i| format!("{}/p{}", base_url, i)))
        .collect();
    let urls: Vec<String> = bounded.results.iter().map(|r| r.url.clone()).collect();
    assert_eq!(urls, expected);
}

#[tokio::test]
async fn test_crawl_is_repeatable() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", "Home", &["/x", "/y", "/z"]).await;
    mount_page(&mock_server, "/x", "X", &["/y", "/x/1"]).await;
    mount_page(&mock_server, "/y", "Y", &["/y/1", "/x"]).await;
    mount_page(&mock_server, "/z", "Z", &["/z/1"]).await;
    mount_page(&mock_server, "/x/1", "X1", &[]).await;
    mount_page(&mock_server, "/y/1", "Y1", &[]).await;
    mount_page(&mock_server, "/z/1", "Z1", &[]).await;

    let service = create_service(memory_store());
    let first = service
        .crawl_site(crawl_params(&base_url, 2, 20), CancellationToken::new())
        .await
        .expect("Crawl failed");
    let second = service
        .crawl_site(crawl_params(&base_url, 2, 20), CancellationToken::new())
        .await
        .expect("Crawl failed");

    let order = |report: &webscrape::CrawlReport| -> Vec<(String, u32)> {
        report
            .results
            .iter()
            .map(|r| (r.url.clone(), r.depth))
            .collect()
    };
    assert_eq!(first.pages_crawled, 7);
    assert_eq!(order(&first), order(&second));
    assert_eq!(
        order(&first)[4..],
        [
            (format!("{}/x/1", base_url), 2),
            (format!("{}/y/1", base_url), 2),
            (format!("{}/z/1", base_url), 2),
        ]
    );
}

#[tokio::test]
async fn test_sqlite_store_survives_reopen() {
    let mock_server = MockServer::start().await;
    mount_page(&mock_server, "/doc", "Doc", &[]).await;

    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("resources.db");
    let ttl = chrono::Duration::seconds(3600);

    let scrape_id = {
        let store: Arc<dyn ResourceStore> =
            Arc::new(SqliteStore::new(&db_path, ttl).expect("Failed to open store"));
        let service = create_service(store);
        let params = ScrapeUrlParams {
            response_format: ResponseFormat::Text,
            ..ScrapeUrlParams::new(format!("{}/doc", mock_server.uri()))
        };
        let result = service.scrape_url(params).await.expect("Scrape failed");
        assert_eq!(result.preview, "Doc body");
        result.scrape_id
    };

    let store: Arc<dyn ResourceStore> =
        Arc::new(SqliteStore::new(&db_path, ttl).expect("Failed to reopen store"));
    let service = create_service(store);

    match service.get_resource(&scrape_id).expect("resource lost") {
        ResourceContent::Content { bytes, mime_type, .. } => {
            assert_eq!(bytes, b"Doc body");
            assert!(mime_type.starts_with("text/plain"));
        }
        other => panic!("expected content, got {:?}", other),
    }
    match service
        .get_resource(&format!("scrape://{}/metadata", scrape_id))
        .expect("metadata lost")
    {
        ResourceContent::Metadata(json) => {
            assert_eq!(json["title"], "Doc");
            assert_eq!(json["status_code"], 200);
            assert_eq!(json["format"], "text");
        }
        other => panic!("expected metadata, got {:?}", other),
    }
}
