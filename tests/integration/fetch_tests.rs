//! Integration tests for the HTTP fetcher
//!
//! These tests use wiremock to check robots.txt handling, status
//! classification and redirects against a real socket.

use sumi_sift::config::{CrawlerConfig, FilterMode, UserAgentConfig};
use sumi_sift::fetch::{FetchErrorKind, Fetcher, HttpFetcher};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_agent() -> UserAgentConfig {
    UserAgentConfig {
        crawler_name: "TestBot".to_string(),
        crawler_version: "1.0.0".to_string(),
        contact_url: "https://example.com/contact".to_string(),
        contact_email: "test@example.com".to_string(),
    }
}

fn crawler_config(respect_robots: bool) -> CrawlerConfig {
    CrawlerConfig {
        max_depth: 1,
        max_concurrency: 1,
        max_pages: None,
        max_duration_secs: None,
        request_delay_ms: 0,
        request_timeout_secs: 5,
        filter_mode: FilterMode::Filter,
        respect_robots,
    }
}

fn fetcher(respect_robots: bool) -> HttpFetcher {
    HttpFetcher::new(&user_agent(), &crawler_config(respect_robots))
        .expect("Failed to build fetcher")
}

async fn mount_robots(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn target_url(server: &MockServer, p: &str) -> Url {
    Url::parse(&format!("{}{}", server.uri(), p)).expect("Failed to parse URL")
}

#[tokio::test]
async fn test_fetch_success() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("<html><body>hello</body></html>")
                .insert_header("content-type", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let response = fetcher(true)
        .fetch(&target_url(&server, "/page"))
        .await
        .expect("Fetch failed");

    assert_eq!(response.status_code, 200);
    assert_eq!(response.final_url, target_url(&server, "/page"));
    assert_eq!(
        response.content_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
    assert_eq!(response.body, b"<html><body>hello</body></html>");
}

#[tokio::test]
async fn test_robots_disallow() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /admin").await;

    Mock::given(method("GET"))
        .and(path("/admin/panel"))
        .respond_with(ResponseTemplate::new(200).set_body_string("secret"))
        .expect(0)
        .mount(&server)
        .await;

    let err = fetcher(true)
        .fetch(&target_url(&server, "/admin/panel"))
        .await
        .expect_err("Fetch should be blocked");
    assert_eq!(err.kind, FetchErrorKind::RobotsDisallowed);
}

#[tokio::test]
async fn test_robots_ignored_when_disabled() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nDisallow: /").await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let response = fetcher(false)
        .fetch(&target_url(&server, "/page"))
        .await
        .expect("Fetch failed");
    assert_eq!(response.body, b"ok");
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let response = fetcher(true)
        .fetch(&target_url(&server, "/page"))
        .await
        .expect("Fetch failed");
    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    let err = fetcher(true)
        .fetch(&target_url(&server, "/missing"))
        .await
        .expect_err("Fetch should fail");
    assert_eq!(err.kind, FetchErrorKind::HttpError(404));
    assert!(err.url.ends_with("/missing"));
}

#[tokio::test]
async fn test_server_error_status() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/boom"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetcher(true)
        .fetch(&target_url(&server, "/boom"))
        .await
        .expect_err("Fetch should fail");
    assert_eq!(err.kind, FetchErrorKind::HttpError(503));
}

#[tokio::test]
async fn test_redirect_reports_final_url() {
    let server = MockServer::start().await;
    mount_robots(&server, "User-agent: *\nAllow: /").await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/new", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
        .mount(&server)
        .await;

    let response = fetcher(true)
        .fetch(&target_url(&server, "/old"))
        .await
        .expect("Fetch failed");
    assert_eq!(response.final_url, target_url(&server, "/new"));
    assert_eq!(response.body, b"moved");
}

#[tokio::test]
async fn test_connection_refused() {
    // nothing listens on port 9 locally
    let target = Url::parse("http://127.0.0.1:9/page").expect("Failed to parse URL");
    let err = fetcher(false)
        .fetch(&target)
        .await
        .expect_err("Fetch should fail");
    assert!(matches!(
        err.kind,
        FetchErrorKind::Connection | FetchErrorKind::Timeout
    ));
}
