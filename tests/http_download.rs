//! HTTP behaviour of the profiler download, against a wiremock server.
//!
//! The downloader is blocking, so the mock server lives on its own tokio
//! runtime and requests are issued from the plain test thread.

use riverbed_supply::defaults::DownloadConfig;
use riverbed_supply::download::{download_file, HttpDownloader};
use riverbed_supply::ErrorCode;
use std::fs;
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ARCHIVE_PATH: &str = "/v2/dn.profiler.linux.zip";

fn fast_config(retries: u32) -> DownloadConfig {
    DownloadConfig {
        timeout_secs: 5,
        connect_timeout_secs: 5,
        retries,
        retry_backoff_ms: 10,
    }
}

fn start_server(rt: &Runtime, mocks: Vec<Mock>) -> MockServer {
    rt.block_on(async {
        let server = MockServer::start().await;
        for mock in mocks {
            mock.mount(&server).await;
        }
        server
    })
}

#[test]
fn streams_body_into_destination() {
    let rt = Runtime::new().unwrap();
    let user_agent = format!("riverbed-supply/{}", env!("CARGO_PKG_VERSION"));
    let server = start_server(
        &rt,
        vec![Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .and(header("user-agent", user_agent.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04payload".to_vec()))
            .expect(1)],
    );
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("dn.profiler.linux.zip");

    let downloader = HttpDownloader::new(&fast_config(0)).unwrap();
    let bytes = download_file(&downloader, &dest, &format!("{}{}", server.uri(), ARCHIVE_PATH))
        .unwrap();

    assert_eq!(bytes, 11);
    assert_eq!(fs::read(&dest).unwrap(), b"PK\x03\x04payload");
}

#[test]
fn client_error_is_not_retried_and_leaves_no_file() {
    let rt = Runtime::new().unwrap();
    let server = start_server(
        &rt,
        vec![Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_string("no such agent"))
            .expect(1)],
    );
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("dn.profiler.linux.zip");

    let downloader = HttpDownloader::new(&fast_config(3)).unwrap();
    let err = download_file(&downloader, &dest, &format!("{}{}", server.uri(), ARCHIVE_PATH))
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::DownloadFailed);
    assert_eq!(err.details["status"], 404);
    assert_eq!(err.details["attempts"], 1);
    assert_eq!(err.retryable, Some(false));
    assert!(!dest.exists());
}

#[test]
fn server_error_is_retried_until_budget_is_spent() {
    let rt = Runtime::new().unwrap();
    let server = start_server(
        &rt,
        vec![Mock::given(method("GET"))
            .and(path(ARCHIVE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .expect(2)],
    );
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("dn.profiler.linux.zip");

    let downloader = HttpDownloader::new(&fast_config(1)).unwrap();
    let err = download_file(&downloader, &dest, &format!("{}{}", server.uri(), ARCHIVE_PATH))
        .unwrap_err();

    assert_eq!(err.details["status"], 503);
    assert_eq!(err.details["attempts"], 2);
    assert_eq!(err.retryable, Some(true));
    assert!(!dest.exists());
}

#[test]
fn transient_server_error_recovers_on_retry() {
    let rt = Runtime::new().unwrap();
    let server = start_server(
        &rt,
        vec![
            Mock::given(method("GET"))
                .and(path(ARCHIVE_PATH))
                .respond_with(ResponseTemplate::new(502))
                .up_to_n_times(1)
                .expect(1),
            Mock::given(method("GET"))
                .and(path(ARCHIVE_PATH))
                .respond_with(ResponseTemplate::new(200).set_body_bytes(b"agent".to_vec()))
                .expect(1),
        ],
    );
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("dn.profiler.linux.zip");

    let downloader = HttpDownloader::new(&fast_config(1)).unwrap();
    let bytes = download_file(&downloader, &dest, &format!("{}{}", server.uri(), ARCHIVE_PATH))
        .unwrap();

    assert_eq!(bytes, 5);
    assert_eq!(fs::read(&dest).unwrap(), b"agent");
}
