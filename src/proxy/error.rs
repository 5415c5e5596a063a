//! Error types for the proxy session.

use thiserror::Error;

use crate::http_client::HttpClientError;

/// Errors raised while talking through the institutional proxy.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// The login page has no usable `<form action>`; the proxy changed its page.
    #[error("malformed proxy login page at {url}: no form action found")]
    MalformedLoginPage { url: String },

    /// The login form does not post.
    #[error("unexpected login form method \"{method}\" (expected post)")]
    UnexpectedFormMethod { method: String },

    /// The proxy sent us back to the login page after we submitted credentials.
    #[error(
        "proxy login was rejected for {url}\n  Suggestion: check [proxy] username and password"
    )]
    LoginRejected { url: String },

    /// The request could not be sent or its body could not be read.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// A URL could not be parsed or rewritten.
    #[error("invalid URL \"{url}\": {message}")]
    InvalidUrl { url: String, message: String },

    /// Building the session's HTTP client failed.
    #[error(transparent)]
    Client(#[from] HttpClientError),
}

impl ProxyError {
    pub(crate) fn network(url: &str, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn invalid_url(url: &str, message: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}
