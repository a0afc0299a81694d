//! Fetch error type for retry classification.

use std::fmt;

/// Error returned by a single document fetch (curl failure, HTTP error, or
/// storage failure). Kept as an enum so we can classify and decide retries
/// before converting to anyhow.
#[derive(Debug)]
pub enum FetchError {
    /// Curl reported an error (timeout, connection, etc.).
    Curl(curl::Error),
    /// HTTP response had a non-2xx status.
    Http(u32),
    /// Transfer completed but fewer bytes arrived than Content-Length
    /// announced (e.g. server closed early). Enables retry instead of
    /// silently archiving a truncated document.
    PartialTransfer { expected: u64, received: u64 },
    /// Disk/storage write failed (e.g. disk full, permission denied). Not retried.
    Storage(std::io::Error),
    /// Redirect resolution finished but the effective URL was not a PDF.
    NotPdf { effective_url: String },
}

impl From<curl::Error> for FetchError {
    fn from(e: curl::Error) -> Self {
        FetchError::Curl(e)
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchError::Curl(e) => write!(f, "{}", e),
            FetchError::Http(code) => write!(f, "HTTP {}", code),
            FetchError::PartialTransfer { expected, received } => {
                write!(
                    f,
                    "partial transfer: expected {} bytes, got {}",
                    expected, received
                )
            }
            FetchError::Storage(e) => write!(f, "storage: {}", e),
            FetchError::NotPdf { effective_url } => {
                write!(f, "resolved URL is not a PDF: {}", effective_url)
            }
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Curl(e) => Some(e),
            FetchError::Storage(e) => Some(e),
            FetchError::Http(_)
            | FetchError::PartialTransfer { .. }
            | FetchError::NotPdf { .. } => None,
        }
    }
}
