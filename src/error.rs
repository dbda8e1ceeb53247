// src/error.rs
//! Error taxonomy of the news pipeline.
//!
//! Provider failures are recovered per source; storage failures abort the
//! current update run. Duplicates and rejections are not errors at all, see
//! `store::InsertOutcome` and `relevance::Rejection`.

use thiserror::Error;

/// One source's fetch failed. Logged and skipped by the aggregator.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (DNS, TLS, connection reset, ...)
    #[error("request failed: {0}")]
    Http(String),

    /// The API answered with a non-success status
    #[error("api error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Body could not be decoded
    #[error("parse error: {0}")]
    Parse(String),

    /// Provider did not settle within its own timeout
    #[error("timed out after {0}s")]
    Timeout(u64),
}

// reqwest's Display carries the request URL, and with it the API key
// sitting in the query string. Reports are public, so the URL goes.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            return ProviderError::Http(format!("timeout: {e}"));
        }
        if e.is_decode() {
            return ProviderError::Parse(e.to_string());
        }
        ProviderError::Http(e.to_string())
    }
}

/// Persistence failure. Fatal to the current run.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("storage serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("storage corrupt: {0}")]
    Corrupt(String),
}

impl StorageError {
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }
}
