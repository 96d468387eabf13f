//! Fetching the profiler archive over HTTP.

use reqwest::blocking::Client;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use std::thread;

use crate::defaults::DownloadConfig;
use crate::error::{Error, Result};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Source of downloadable artifacts.
pub trait Downloader {
    /// Stream the body at `url` into `sink`. Returns the number of bytes written.
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64>;
}

/// Fetch `url` into a freshly created `local_path`, replacing any previous
/// content. A failed fetch never leaves a partial file behind.
pub fn download_file(downloader: &dyn Downloader, local_path: &Path, url: &str) -> Result<u64> {
    let path = local_path.display().to_string();

    let mut file = File::create(local_path).map_err(|e| {
        Error::download_failed(url, format!("create {}: {}", path, e), None, 0, false)
            .with_detail("path", path.as_str())
    })?;

    let fetched = downloader
        .fetch(url, &mut file)
        .and_then(|bytes| {
            file.flush()
                .map(|_| bytes)
                .map_err(|e| Error::write_failed(path.as_str(), e.to_string()))
        });

    match fetched {
        Ok(bytes) => Ok(bytes),
        Err(err) => {
            drop(file);
            let _ = fs::remove_file(local_path);
            Err(err.with_detail("path", path.as_str()))
        }
    }
}

/// Blocking HTTP GET with a deadline and a bounded number of retries.
///
/// Non-2xx responses are failures. Client errors (4xx) are returned at once;
/// transport errors and server errors (5xx) are retried after a linear backoff.
/// Once body bytes have reached the sink a failure is final.
pub struct HttpDownloader {
    client: Client,
    config: DownloadConfig,
}

struct AttemptFailure {
    error: String,
    status: Option<u16>,
    retry: bool,
}

impl HttpDownloader {
    pub fn new(config: &DownloadConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(format!("riverbed-supply/{}", VERSION))
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| Error::internal_io(e.to_string(), Some("create HTTP client".to_string())))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn attempt(&self, url: &str, sink: &mut dyn Write) -> std::result::Result<u64, AttemptFailure> {
        let mut response = self.client.get(url).send().map_err(|e| AttemptFailure {
            error: e.to_string(),
            status: e.status().map(|s| s.as_u16()),
            retry: true,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptFailure {
                error: format!("server responded with HTTP {}", status),
                status: Some(status.as_u16()),
                retry: status.is_server_error(),
            });
        }

        io::copy(&mut response, sink).map_err(|e| AttemptFailure {
            error: format!("stream body: {}", e),
            status: Some(status.as_u16()),
            retry: false,
        })
    }
}

impl Downloader for HttpDownloader {
    fn fetch(&self, url: &str, sink: &mut dyn Write) -> Result<u64> {
        let mut attempts = 0;

        loop {
            if attempts > 0 {
                thread::sleep(self.config.backoff(attempts));
            }
            attempts += 1;

            match self.attempt(url, sink) {
                Ok(bytes) => return Ok(bytes),
                Err(failure) if failure.retry && attempts <= self.config.retries => continue,
                Err(failure) => {
                    return Err(Error::download_failed(
                        url,
                        failure.error,
                        failure.status,
                        attempts,
                        failure.retry,
                    ));
                }
            }
        }
    }
}
