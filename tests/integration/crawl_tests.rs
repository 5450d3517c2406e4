//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end against real content stores.

use std::path::Path;
use sumi_spider::config::{Config, CrawlerConfig, OutputConfig, StoreBackend, UserAgentConfig};
use sumi_spider::crawler::Crawler;
use sumi_spider::storage::{open_store, AnyStore, FileStore};
use sumi_spider::storage_key;
use url::Url;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration storing files under `download_dir`
fn create_test_config(download_dir: &Path, max_depth: u32) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_depth,
            concurrency: 4,
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestSpider".to_string(),
            crawler_version: "1.0".to_string(),
            timeout_secs: 5,
        },
        output: OutputConfig {
            backend: StoreBackend::Files,
            download_dir: download_dir.to_string_lossy().into_owned(),
            ..OutputConfig::default()
        },
    }
}

/// Builds an HTML page linking to each of `links`
fn html_page(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>{}</body></html>",
        title, anchors
    )
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Path of the file a URL is stored under in a file store
fn stored_path(store: &FileStore, url: &str) -> std::path::PathBuf {
    let key = storage_key(&Url::parse(url).unwrap(), "html");
    store.path_for(&key).unwrap()
}

#[tokio::test]
async fn test_full_crawl_downloads_linked_pages() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            &[format!("{}/page1", base_url), "/page2".to_string()],
        ),
    )
    .await;
    mount_page(&mock_server, "/page1", html_page("Page 1", &[])).await;
    mount_page(&mock_server, "/page2", html_page("Page 2", &[])).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 2);
    let store = FileStore::new(dir.path());
    let crawler = Crawler::from_config(&config, store.clone()).unwrap();

    let report = crawler
        .crawl(&format!("{}/", base_url), config.crawler.max_depth)
        .await
        .expect("Crawl failed");

    assert_eq!(report.visited, 3);
    assert_eq!(report.fetched, 3);
    assert!(report.is_clean());

    let home = std::fs::read_to_string(stored_path(&store, &format!("{}/", base_url))).unwrap();
    assert!(home.contains("<title>Home</title>"));
    assert!(stored_path(&store, &format!("{}/page1", base_url)).exists());
    assert!(stored_path(&store, &format!("{}/page2", base_url)).exists());
}

#[tokio::test]
async fn test_missing_child_is_isolated() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/",
        html_page(
            "Home",
            &["/a".to_string(), "/b".to_string(), "/missing".to_string()],
        ),
    )
    .await;
    mount_page(&mock_server, "/a", html_page("A", &[])).await;
    mount_page(&mock_server, "/b", html_page("B", &[])).await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 2);
    let crawler = Crawler::from_config(&config, FileStore::new(dir.path())).unwrap();

    let report = crawler
        .crawl(&format!("{}/", base_url), 2)
        .await
        .expect("Node failures must not fail the crawl");

    assert_eq!(report.visited, 4);
    assert_eq!(report.succeeded(), 3);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, format!("{}/missing", base_url));
    assert!(report.failures[0].error.contains("404"));
}

#[tokio::test]
async fn test_second_run_served_from_store() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Home", &["/page1".to_string()])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Page 1", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 2);
    let root = format!("{}/", base_url);

    let first = Crawler::from_config(&config, FileStore::new(dir.path()))
        .unwrap()
        .crawl(&root, 2)
        .await
        .unwrap();
    assert_eq!(first.fetched, 2);

    // A new crawler over the same directory reuses every document
    let second = Crawler::from_config(&config, FileStore::new(dir.path()))
        .unwrap()
        .crawl(&root, 2)
        .await
        .unwrap();
    assert_eq!(second.visited, 2);
    assert_eq!(second.fetched, 0);
    assert_eq!(second.cache_hits, 2);

    // Wiremock verifies expect(1) when the mock server drops
}

#[tokio::test]
async fn test_crawl_with_depth_limit() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    // Create a chain: / -> level1 -> level2 -> level3
    mount_page(&mock_server, "/", html_page("Root", &["/level1".to_string()])).await;
    mount_page(&mock_server, "/level1", html_page("Level 1", &["/level2".to_string()])).await;
    mount_page(&mock_server, "/level2", html_page("Level 2", &["/level3".to_string()])).await;

    Mock::given(method("GET"))
        .and(path("/level3"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Level 3", &[])))
        .expect(0) // Should never be called with max_depth=3
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 3);
    let crawler = Crawler::from_config(&config, FileStore::new(dir.path())).unwrap();

    let report = crawler.crawl(&format!("{}/", base_url), 3).await.unwrap();

    assert_eq!(report.visited, 3);
    assert_eq!(report.links_discovered, 3);
}

#[tokio::test]
async fn test_depth_zero_makes_no_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 0);
    let crawler = Crawler::from_config(&config, FileStore::new(dir.path())).unwrap();

    let report = crawler.crawl(&mock_server.uri(), 0).await.unwrap();
    assert_eq!(report.visited, 0);
}

#[tokio::test]
async fn test_sends_configured_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestSpider/1.0"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html_page("Home", &[])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(dir.path(), 1);
    let crawler = Crawler::from_config(&config, FileStore::new(dir.path())).unwrap();

    let report = crawler.crawl(&mock_server.uri(), 1).await.unwrap();
    assert!(report.is_clean());
}

#[tokio::test]
async fn test_sqlite_backend_crawl() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/", html_page("Home", &["/a".to_string()])).await;
    mount_page(&mock_server, "/a", html_page("A", &[])).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(dir.path(), 2);
    config.output.backend = StoreBackend::Sqlite;
    config.output.database_path = dir.path().join("spider.db").to_string_lossy().into_owned();

    let store = open_store(&config.output).unwrap();
    let crawler = Crawler::from_config(&config, store).unwrap();

    let report = crawler.crawl(&format!("{}/", base_url), 2).await.unwrap();
    assert_eq!(report.fetched, 2);

    match crawler.store() {
        AnyStore::Sqlite(store) => assert_eq!(store.document_count().unwrap(), 2),
        _ => panic!("expected a sqlite store"),
    }
}
