//! Single-stream HTTP GET fetcher built on curl Easy handles.
//!
//! Streams the response body into a `StorageWriter` as it arrives; nothing
//! is buffered in memory. Runs blocking, so call it from a worker thread.

mod resolve;

pub use resolve::resolve_document_url;

use std::str;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::retry::FetchError;
use crate::storage::StorageWriter;

/// Per-request knobs, derived from the global config.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(600),
        }
    }
}

impl FetchOptions {
    pub fn from_config(cfg: &crate::config::YoinkConfig) -> Self {
        Self {
            connect_timeout: Duration::from_secs(cfg.connect_timeout_secs),
            request_timeout: Duration::from_secs(cfg.request_timeout_secs),
        }
    }
}

/// Downloads `url` with a single GET, streaming the body to `storage`.
/// Follows redirects. Returns the number of bytes written.
pub fn download_to(
    url: &str,
    storage: &StorageWriter,
    opts: FetchOptions,
) -> Result<u64, FetchError> {
    let offset = Arc::new(AtomicU64::new(0));
    let offset_cb = Arc::clone(&offset);
    let storage_cb = storage.clone();

    let mut easy = curl::easy::Easy::new();
    easy.url(url)?;
    easy.follow_location(true)?;
    easy.max_redirections(10)?;
    easy.connect_timeout(opts.connect_timeout)?;
    easy.low_speed_limit(1024)?;
    easy.low_speed_time(Duration::from_secs(60))?;
    easy.timeout(opts.request_timeout)?;

    let mut content_length: Option<u64> = None;
    let mut write_err: Option<std::io::Error> = None;
    let perform_result = {
        let mut transfer = easy.transfer();
        transfer.header_function(|data| {
            if let Ok(s) = str::from_utf8(data) {
                let s = s.trim_end();
                // A new status line starts a new response (redirect hop);
                // only the final response's length matters.
                if s.starts_with("HTTP/") {
                    content_length = None;
                } else if let Some((name, value)) = s.split_once(':') {
                    if name.trim().eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().ok();
                    }
                }
            }
            true
        })?;
        transfer.write_function(|data| {
            let off = offset_cb.fetch_add(data.len() as u64, Ordering::Relaxed);
            match storage_cb.write_at(off, data) {
                Ok(()) => Ok(data.len()),
                Err(e) => {
                    tracing::warn!("download write failed: {}", e);
                    write_err = Some(std::io::Error::other(e.to_string()));
                    Ok(0) // abort transfer
                }
            }
        })?;
        transfer.perform()
    };
    if let Err(e) = perform_result {
        if let Some(io) = write_err.take() {
            return Err(FetchError::Storage(io));
        }
        return Err(FetchError::Curl(e));
    }

    let code = easy.response_code()?;
    if !(200..300).contains(&code) {
        return Err(FetchError::Http(code));
    }

    let written = offset.load(Ordering::Relaxed);
    if let Some(expected) = content_length {
        if written != expected {
            return Err(FetchError::PartialTransfer {
                expected,
                received: written,
            });
        }
    }
    Ok(written)
}
