//! Error types for PDF discovery and download.

use std::path::PathBuf;

use thiserror::Error;

use crate::http_client::HttpClientError;
use crate::proxy::ProxyError;
use crate::store::StoreError;

/// Errors that can occur while locating, downloading or filing a PDF.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A remote service answered in an unexpected shape (e.g. no redirect
    /// where one was required).
    #[error("unexpected response from {url}: {message}")]
    RemoteProtocol { url: String, message: String },

    /// The downloaded content does not start with the PDF magic bytes.
    ///
    /// The partial file has already been removed; the next strategy may
    /// still succeed.
    #[error("response from {url} is not a PDF")]
    NotPdf { url: String },

    /// Network-level error while talking to a lookup service.
    #[error("network error fetching {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// HTTP error response for the chosen PDF URL.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// File system error in the library directory.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Proxy(#[from] ProxyError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Client(#[from] HttpClientError),
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn protocol(url: &str, message: impl Into<String>) -> Self {
        Self::RemoteProtocol {
            url: url.to_string(),
            message: message.into(),
        }
    }
}
