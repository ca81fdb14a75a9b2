//! Common test utilities for fetch-dl integration tests

use std::path::Path;
use std::time::Duration;

use fetch_dl::{BatchDownloader, FetchConfig};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Deterministic image-like payload of `len` bytes
pub fn payload(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}

/// Serve `body` at `route` for GET requests
pub async fn mount_body(server: &MockServer, route: &str, body: Vec<u8>) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body))
        .mount(server)
        .await;
}

/// Serve `body` at `route` after `delay`
pub async fn mount_delayed(server: &MockServer, route: &str, body: Vec<u8>, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_bytes(body)
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// Answer `route` with a bare status code
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of requests the server has seen so far
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}

/// Config rooted in a scratch directory with short timeouts
pub fn test_config(root: &Path) -> FetchConfig {
    FetchConfig {
        files_dir: root.to_path_buf(),
        item_timeout: Duration::from_secs(10),
        connect_timeout: Duration::from_secs(2),
        ..Default::default()
    }
}

/// HTTP-backed downloader for `config`
pub fn http_downloader(config: FetchConfig) -> BatchDownloader {
    match BatchDownloader::new(config) {
        Ok(downloader) => downloader,
        Err(e) => panic!("failed to build downloader: {e}"),
    }
}
