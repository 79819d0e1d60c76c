//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and test
//! the full crawl cycle end-to-end, writing into temporary directories.

use async_trait::async_trait;
use harvester::config::Config;
use harvester::crawler::Coordinator;
use harvester::render::{PageRenderer, RenderError};
use harvester::CrawlOutcome;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Upper bound for any single crawl in these tests
const CRAWL_DEADLINE: Duration = Duration::from_secs(20);

/// Creates a test configuration writing into `out`
fn create_test_config(out: &TempDir, depth: i32, file_types: &[&str]) -> Config {
    let mut config = Config::default();
    config.crawler.depth = depth;
    config.crawler.file_types = file_types.iter().map(|s| s.to_string()).collect();
    config.crawler.request_timeout_secs = 10;
    config.output.dir = out.path().to_string_lossy().into_owned();
    config
}

fn html_page(body: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), "text/html; charset=utf-8")
}

fn binary(content_type: &str, bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(bytes.to_vec(), content_type)
}

/// Renderer that serves fixed markup and counts its calls
struct StaticRenderer {
    html: String,
    renders: AtomicUsize,
}

impl StaticRenderer {
    fn new(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: html.to_string(),
            renders: AtomicUsize::new(0),
        })
    }

    fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageRenderer for StaticRenderer {
    async fn render(&self, _url: &Url, _timeout: Duration) -> Result<String, RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        Ok(self.html.clone())
    }
}

/// Runs a crawl to completion, failing the test if it does not terminate
async fn crawl(config: Config, seeds: &[String]) -> Coordinator {
    let coordinator = Coordinator::new(config).expect("Failed to create coordinator");
    run_to_completion(coordinator, seeds).await
}

async fn run_to_completion(mut coordinator: Coordinator, seeds: &[String]) -> Coordinator {
    coordinator.seed(seeds);

    let outcome = tokio::time::timeout(CRAWL_DEADLINE, coordinator.run(std::future::pending()))
        .await
        .expect("Crawl did not terminate");
    assert_eq!(outcome, CrawlOutcome::Completed);

    coordinator
}

fn files_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .map(|e| e.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();
    names.sort();
    names
}

#[tokio::test]
async fn test_single_page_saves_image() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<html><body><img src="/img/pic.jpg"><p>hello</p></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/img/pic.jpg"))
        .respond_with(binary("image/jpeg", b"\xff\xd8\xff\xe0jpeg"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 1, &["jpg"]);
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;

    let saved = out.path().join("127.0.0.1").join("pic.jpg");
    assert_eq!(std::fs::read(saved).unwrap(), b"\xff\xd8\xff\xe0jpeg");

    let stats = coordinator.stats();
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.pages_parsed, 1);
    assert_eq!(stats.resources_saved, 1);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn test_two_level_crawl_stays_on_host() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    // Same server, but a different host name as far as the crawler can tell
    let external = base_url.replace("127.0.0.1", "localhost");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(
            r#"<html><body>
            <a href="/a">A</a>
            <a href="{external}/ext">External</a>
            </body></html>"#
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(
            r#"<html><body><img src="photo.png"><a href="/b">B</a></body></html>"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/photo.png"))
        .respond_with(binary("image/png", b"\x89PNG\r\n\x1a\n"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // Beyond the depth limit
    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page("<p>too deep</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ext"))
        .respond_with(html_page("<p>external</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 2, &["png"]);
    let coordinator = crawl(config, &[format!("{base_url}/")]).await;

    assert_eq!(files_in(&out.path().join("127.0.0.1")), vec!["photo.png"]);

    let stats = coordinator.stats();
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.links_enqueued, 1);
}

#[tokio::test]
async fn test_external_links_followed_when_enabled() {
    let mock_server = MockServer::start().await;
    let external = mock_server.uri().replace("127.0.0.1", "localhost");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(format!(r#"<a href="{external}/ext">External</a>"#)))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ext"))
        .respond_with(html_page(r#"<img src="/logo.gif">"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/logo.gif"))
        .respond_with(binary("image/gif", b"GIF89a"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let mut config = create_test_config(&out, 2, &["gif"]);
    config.crawler.external_webpages = true;
    crawl(config, &[format!("{}/", mock_server.uri())]).await;

    assert!(out.path().join("localhost").join("logo.gif").is_file());
}

#[tokio::test]
async fn test_duplicate_discovery_fetches_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<a href="/a">A</a><a href="/a#again">A again</a><a href="/b">B</a>
            <img src="/shared.jpg">"#,
        ))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/a"))
        .respond_with(html_page(r#"<a href="/b">B</a><img src="/shared.jpg">"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/b"))
        .respond_with(html_page(r#"<a href="/a">A</a><img src="/shared.jpg">"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/shared.jpg"))
        .respond_with(binary("image/jpeg", b"\xff\xd8\xff"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let mut config = create_test_config(&out, 3, &["jpg"]);
    config.crawler.max_concurrency = 4;
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;

    let stats = coordinator.stats();
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.resources_saved, 1);
    // "/", "/a", "/b" and the shared image
    assert_eq!(coordinator.visited_count(), 4);
}

#[tokio::test]
async fn test_unlimited_depth_cycle_terminates() {
    let mock_server = MockServer::start().await;

    for (page, next) in [("/", "/one"), ("/one", "/two"), ("/two", "/")] {
        Mock::given(method("GET"))
            .and(path(page))
            .respond_with(html_page(format!(r#"<a href="{next}">next</a>"#)))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, -1, &["jpg"]);
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;

    assert_eq!(coordinator.stats().pages_fetched, 3);
    assert_eq!(coordinator.visited_count(), 3);
}

#[tokio::test]
async fn test_octet_stream_naming() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/download"))
        .respond_with(
            binary("application/octet-stream", b"%PDF-1.7")
                .insert_header("content-disposition", r#"attachment; filename="report.pdf""#),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/files/archive.pdf"))
        .respond_with(binary("application/octet-stream", b"%PDF-1.4"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/blob"))
        .respond_with(binary("application/octet-stream", b"\x00\x01"))
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 1, &["pdf"]);
    let base_url = mock_server.uri();
    let coordinator = crawl(
        config,
        &[
            format!("{base_url}/download"),
            format!("{base_url}/files/archive.pdf"),
            format!("{base_url}/blob"),
        ],
    )
    .await;

    let host_dir = out.path().join("127.0.0.1");
    assert_eq!(files_in(&host_dir), vec!["archive.pdf", "report.pdf"]);
    assert_eq!(std::fs::read(host_dir.join("report.pdf")).unwrap(), b"%PDF-1.7");
    assert_eq!(coordinator.stats().resources_saved, 2);
}

#[tokio::test]
async fn test_linked_typed_resource_is_saved() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(r#"<a href="/docs/manual">Manual</a>"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/docs/manual"))
        .respond_with(binary("application/pdf", b"%PDF-1.5"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 2, &["pdf"]);
    crawl(config, &[format!("{}/", mock_server.uri())]).await;

    assert_eq!(files_in(&out.path().join("127.0.0.1")), vec!["manual.pdf"]);
}

#[tokio::test]
async fn test_bounded_concurrency_limits_parallel_pages() {
    let mock_server = MockServer::start().await;
    let delay = Duration::from_millis(200);

    let links: String = (0..6).map(|i| format!(r#"<a href="/p{i}">{i}</a>"#)).collect();
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(links))
        .mount(&mock_server)
        .await;

    for i in 0..6 {
        Mock::given(method("GET"))
            .and(path(format!("/p{i}")))
            .respond_with(html_page("<p>leaf</p>").set_delay(delay))
            .expect(1)
            .mount(&mock_server)
            .await;
    }

    let out = TempDir::new().unwrap();
    let mut config = create_test_config(&out, 2, &["jpg"]);
    config.crawler.max_concurrency = 2;

    let started = Instant::now();
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;
    let elapsed = started.elapsed();

    assert_eq!(coordinator.stats().pages_fetched, 7);
    // Six delayed pages, two at a time
    assert!(
        elapsed >= delay * 3,
        "Expected at least {:?}, took {:?}",
        delay * 3,
        elapsed
    );
}

#[tokio::test]
async fn test_legacy_charset_title_snapshot() {
    let mock_server = MockServer::start().await;

    let mut body = b"<html><head><meta charset=\"windows-1252\"><title>Caf".to_vec();
    body.push(0xe9);
    body.extend_from_slice(b"</title></head><body>menu</body></html>");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(binary("text/html", &body))
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 1, &["html"]);
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;

    let snapshot = out.path().join("127.0.0.1").join("Café.html");
    let saved = std::fs::read_to_string(snapshot).unwrap();
    assert!(saved.contains("<title>Café</title>"));
    assert_eq!(coordinator.stats().snapshots_saved, 1);
}

#[tokio::test]
async fn test_failed_pages_do_not_stop_crawl() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            r#"<a href="/missing">gone</a><a href="/ok">ok</a><img src="/broken.jpg">"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/broken.jpg"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/ok"))
        .respond_with(html_page(r#"<img src="/fine.jpg">"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/fine.jpg"))
        .respond_with(binary("image/jpeg", b"\xff\xd8\xff"))
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 2, &["jpg"]);
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;

    assert_eq!(files_in(&out.path().join("127.0.0.1")), vec!["fine.jpg"]);
    assert_eq!(coordinator.stats().failures, 2);
}

#[tokio::test]
async fn test_mime_mismatch_is_logged_not_failed() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(r#"<img src="/x.jpg">"#))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/x.jpg"))
        .respond_with(binary("text/plain", b"not an image"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 1, &["jpg"]);
    let coordinator = crawl(config, &[format!("{}/", mock_server.uri())]).await;

    let saved = out.path().join("127.0.0.1").join("x.jpg");
    assert_eq!(std::fs::read(saved).unwrap(), b"not an image");

    let stats = coordinator.stats();
    assert_eq!(stats.resources_saved, 1);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn test_html_page_is_rendered_instead_of_fetched() {
    let mock_server = MockServer::start().await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "text/html"))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("<p>static markup</p>"))
        .expect(0)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/r.jpg"))
        .respond_with(binary("image/jpeg", b"\xff\xd8\xff"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 1, &["jpg"]);
    let renderer = StaticRenderer::new(r#"<html><body><img src="/r.jpg"></body></html>"#);
    let coordinator = Coordinator::with_renderer(config, renderer.clone()).unwrap();
    let coordinator = run_to_completion(coordinator, &[format!("{}/", mock_server.uri())]).await;

    assert_eq!(renderer.renders(), 1);
    assert!(out.path().join("127.0.0.1").join("r.jpg").is_file());

    let stats = coordinator.stats();
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.pages_parsed, 1);
    assert_eq!(stats.failures, 0);
}

#[tokio::test]
async fn test_render_falls_back_to_get_when_head_is_not_html() {
    let mock_server = MockServer::start().await;

    // A non-HTML type
    Mock::given(method("HEAD"))
        .and(path("/photo.jpg"))
        .respond_with(ResponseTemplate::new(200).insert_header("content-type", "image/jpeg"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/photo.jpg"))
        .respond_with(binary("image/jpeg", b"\xff\xd8\xff\xe0"))
        .expect(1)
        .mount(&mock_server)
        .await;

    // HTML, but HEAD is refused
    Mock::given(method("HEAD"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(405).insert_header("content-type", "text/html"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(html_page(r#"<img src="/inner.jpg">"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/inner.jpg"))
        .respond_with(binary("image/jpeg", b"\xff\xd8\xff"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let out = TempDir::new().unwrap();
    let config = create_test_config(&out, 1, &["jpg"]);
    let renderer = StaticRenderer::new("<p>rendered</p>");
    let coordinator = Coordinator::with_renderer(config, renderer.clone()).unwrap();
    let base_url = mock_server.uri();
    let coordinator = run_to_completion(
        coordinator,
        &[format!("{base_url}/photo.jpg"), format!("{base_url}/page")],
    )
    .await;

    assert_eq!(renderer.renders(), 0);
    assert_eq!(
        files_in(&out.path().join("127.0.0.1")),
        vec!["inner.jpg", "photo.jpg"]
    );
    assert_eq!(coordinator.stats().failures, 0);
}
