//! Integration tests for page fetching and file downloads
//!
//! These tests use wiremock to create mock HTTP servers and check the
//! request, retry and persistence rules against real sockets.

use site_downloader::config::Config;
use site_downloader::crawler::{DownloadContext, TaskContext, TimeoutPolicy};
use site_downloader::plugin::PluginRegistry;
use site_downloader::TaskError;
use std::net::TcpListener;
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a task context rooted at `dir`
fn create_test_context(dir: &TempDir) -> TaskContext {
    let mut config = Config::default();
    config.downloader.user_agent = "TestAgent/1.0".to_string();
    config.timeouts.connect_attempts = 3;

    let shared = DownloadContext::new(&config, dir.path(), PluginRegistry::new())
        .expect("Failed to build download context");
    TaskContext::new(
        Arc::new(shared),
        Arc::new(TimeoutPolicy::from_config(&config.timeouts)),
    )
}

/// Returns a local address nothing is listening on
fn closed_port_url(file: &str) -> (String, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    drop(listener);
    (format!("http://{}/{}", addr, file), addr.to_string())
}

#[tokio::test]
async fn test_download_writes_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/files/archive.bin"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(vec![7u8; 20_000])
                .insert_header("content-type", "application/octet-stream"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let target = dir.path().join("nested/archive.bin");

    let written = ctx
        .download_file(
            &format!("{}/files/archive.bin", mock_server.uri()),
            &target,
            None,
        )
        .await
        .expect("Download should succeed");

    assert_eq!(written, 20_000);
    assert_eq!(std::fs::read(&target).unwrap(), vec![7u8; 20_000]);
    assert!(ctx.take_failures().is_empty());
}

#[tokio::test]
async fn test_html_response_is_not_saved_as_file() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/pic.png"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(
                "<html><body>Please log in</body></html>",
                "text/html; charset=utf-8",
            ),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let target = dir.path().join("pic.png");

    let result = ctx
        .download_file(&format!("{}/pic.png", mock_server.uri()), &target, None)
        .await;

    match result {
        Err(TaskError::HttpRequest(message)) => {
            assert!(message.contains("instead of a file"), "unexpected message: {}", message)
        }
        other => panic!("expected HttpRequest error, got {:?}", other),
    }
    assert!(!target.exists());
}

#[tokio::test]
async fn test_bad_status_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/missing.png"))
        .respond_with(ResponseTemplate::new(404).insert_header("content-type", "image/png"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let target = dir.path().join("missing.png");

    let result = ctx
        .download_file(&format!("{}/missing.png", mock_server.uri()), &target, None)
        .await;

    assert!(matches!(result, Err(TaskError::HttpRequest(_))));
    assert!(!target.exists());
}

#[tokio::test]
async fn test_existing_file_fails_before_any_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"new".to_vec()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let target = dir.path().join("logo.gif");
    std::fs::write(&target, b"old").unwrap();
    let ctx = create_test_context(&dir);

    let result = ctx
        .download_file(&format!("{}/logo.gif", mock_server.uri()), &target, None)
        .await;

    assert_eq!(result, Err(TaskError::FileExists(target.clone())));
    assert_eq!(std::fs::read(&target).unwrap(), b"old");
}

#[tokio::test]
async fn test_connect_failures_are_retried_and_counted() {
    let (url, domain) = closed_port_url("photo.jpg");
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);
    let target = dir.path().join("photo.jpg");

    let result = ctx.download_file(&url, &target, None).await;

    assert!(matches!(result, Err(TaskError::HttpConnect(_))));
    assert!(!target.exists());

    let failures = ctx.take_failures();
    assert_eq!(failures.get(&domain), 3);
    assert!(ctx.take_failures().is_empty());
}

#[tokio::test]
async fn test_get_page_retries_bad_status() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thread"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/thread"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>ok</html>"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);

    let body = ctx
        .get_page(&format!("{}/thread", mock_server.uri()), None)
        .await
        .expect("Third attempt should succeed");
    assert_eq!(body, "<html>ok</html>");
}

#[tokio::test]
async fn test_get_page_gives_up_after_attempts() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&mock_server)
        .await;

    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);

    let result = ctx
        .get_page(&format!("{}/thread", mock_server.uri()), None)
        .await;
    assert!(matches!(result, Err(TaskError::HttpRequest(_))));
}

#[tokio::test]
async fn test_get_page_connect_failure() {
    let (url, domain) = closed_port_url("showthread.php?1-a");
    let dir = TempDir::new().unwrap();
    let ctx = create_test_context(&dir);

    let result = ctx.get_page(&url, None).await;

    assert!(matches!(result, Err(TaskError::HttpConnect(_))));
    assert_eq!(ctx.take_failures().get(&domain), 3);
}
