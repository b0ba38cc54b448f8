//! Archive fetching
//!
//! A single streaming GET per dependency version. No retries and no
//! resumable downloads: transient failures surface to the build, which
//! is expected to re-run.

use crate::config::schema::FetchConfig;
use crate::error::{NetworkErrorKind, StageError, StageResult};
use crate::ui;
use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const CHUNK_SIZE: usize = 64 * 1024;

/// Downloads a remote archive to a local path
pub trait Fetcher: Send + Sync {
    /// Stream `url` into `destination`, overwriting any existing file.
    ///
    /// Returns the number of bytes written.
    fn fetch(&self, url: &str, destination: &Path) -> StageResult<u64>;
}

impl<T: Fetcher + ?Sized> Fetcher for &T {
    fn fetch(&self, url: &str, destination: &Path) -> StageResult<u64> {
        (**self).fetch(url, destination)
    }
}

/// HTTP(S) fetcher backed by a `ureq` agent
pub struct HttpFetcher {
    agent: ureq::Agent,
    progress: bool,
}

impl HttpFetcher {
    /// Create a fetcher with an optional whole-transfer deadline
    pub fn new(timeout: Option<Duration>) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(timeout)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            progress: false,
        }
    }

    /// Create a fetcher from the `[fetch]` config section
    pub fn from_config(config: &FetchConfig) -> Self {
        let timeout = (config.timeout_secs > 0).then(|| Duration::from_secs(config.timeout_secs));
        Self::new(timeout)
    }

    /// Show a byte progress bar while downloading
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> StageResult<u64> {
        debug!("GET {}", url);
        let response = self
            .agent
            .get(url)
            .call()
            .map_err(|e| StageError::network(url, classify_request_error(e)))?;

        let expected = response.body().content_length();
        let mut reader = response.into_body().into_reader();

        let file = File::create(destination)
            .map_err(|e| StageError::filesystem("creating archive", destination, e))?;
        let mut writer = BufWriter::new(file);

        let bar = self.progress.then(|| {
            let label = url.rsplit('/').next().unwrap_or(url);
            ui::download_bar(expected, label)
        });

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut received: u64 = 0;
        loop {
            let n = match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    if let Some(ref bar) = bar {
                        bar.abandon();
                    }
                    return Err(StageError::network(url, classify_stream_error(&e)));
                }
            };
            writer
                .write_all(&buf[..n])
                .map_err(|e| StageError::filesystem("writing archive", destination, e))?;
            received += n as u64;
            if let Some(ref bar) = bar {
                bar.inc(n as u64);
            }
        }

        writer
            .flush()
            .map_err(|e| StageError::filesystem("writing archive", destination, e))?;

        if let Some(ref bar) = bar {
            bar.finish_and_clear();
        }

        if let Some(expected) = expected {
            if received < expected {
                return Err(StageError::network(
                    url,
                    NetworkErrorKind::Truncated { expected, received },
                ));
            }
        }

        debug!("Downloaded {} bytes to {}", received, destination.display());
        Ok(received)
    }
}

fn classify_request_error(err: ureq::Error) -> NetworkErrorKind {
    match err {
        ureq::Error::StatusCode(code) => NetworkErrorKind::Status(code),
        ureq::Error::Timeout(_) => NetworkErrorKind::Timeout,
        ureq::Error::Io(ref e) if e.kind() == io::ErrorKind::TimedOut => NetworkErrorKind::Timeout,
        other => NetworkErrorKind::Unreachable(other.to_string()),
    }
}

fn classify_stream_error(err: &io::Error) -> NetworkErrorKind {
    let timed_out = err.kind() == io::ErrorKind::TimedOut
        || matches!(
            err.get_ref().and_then(|inner| inner.downcast_ref::<ureq::Error>()),
            Some(ureq::Error::Timeout(_))
        );
    if timed_out {
        NetworkErrorKind::Timeout
    } else {
        NetworkErrorKind::Interrupted(err.to_string())
    }
}
