//! Error types for the autolearning ingesters.

use thiserror::Error;

use crate::config::ConfigError;
use crate::http_client::HttpClientError;
use crate::parser::RefKind;

use super::xml::XmlError;

/// Errors raised while fetching or parsing remote metadata.
#[derive(Debug, Error)]
pub enum LearnError {
    /// A credential the route needs is not configured.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The upstream response does not have the expected shape.
    #[error("unexpected response from {service}: {message}")]
    RemoteProtocol {
        service: &'static str,
        message: String,
    },

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// No ingester exists for this kind of reference.
    #[error("cannot auto-learn {kind} reference \"{text}\"")]
    Unlearnable { text: String, kind: RefKind },

    /// The search words cannot be turned into a query.
    #[error("invalid search: {0}")]
    InvalidSearch(String),

    /// Building an HTTP client failed.
    #[error(transparent)]
    Client(#[from] HttpClientError),
}

impl LearnError {
    /// Creates a protocol error for `service`.
    #[must_use]
    pub fn protocol(service: &'static str, message: impl Into<String>) -> Self {
        Self::RemoteProtocol {
            service,
            message: message.into(),
        }
    }

    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn xml(service: &'static str, error: &XmlError) -> Self {
        Self::protocol(service, error.to_string())
    }

    /// Returns `true` for upstream shape failures.
    #[must_use]
    pub fn is_remote_protocol(&self) -> bool {
        matches!(self, Self::RemoteProtocol { .. })
    }
}
