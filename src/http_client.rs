//! Shared HTTP client construction policy.
//!
//! Every client gets the configured connect/read timeouts, gzip, and a
//! User-Agent. Redirect lookups need a client that does not follow
//! redirects; everything else follows them.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::{Client, ClientBuilder, redirect};
use thiserror::Error;
use tracing::warn;

use crate::config::HttpTimeouts;
use crate::user_agent;

/// Failure to construct an HTTP client.
#[derive(Debug, Error)]
#[error("failed to build HTTP client for {purpose}: {message}")]
pub struct HttpClientError {
    /// What the client was for (used only in messages).
    pub purpose: String,
    pub message: String,
}

impl HttpClientError {
    fn new(purpose: &str, message: impl Into<String>) -> Self {
        Self {
            purpose: purpose.to_string(),
            message: message.into(),
        }
    }
}

/// Whether a client follows HTTP redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Redirects {
    Follow,
    /// Hand 3xx responses back to the caller untouched.
    Manual,
}

/// Options for [`build_http_client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub user_agent: String,
    pub cookie_jar: Option<Arc<Jar>>,
    pub redirects: Redirects,
    pub timeouts: HttpTimeouts,
}

impl ClientOptions {
    /// Default user agent, no cookies, following redirects.
    #[must_use]
    pub fn new(timeouts: HttpTimeouts) -> Self {
        Self {
            user_agent: user_agent::default_user_agent(),
            cookie_jar: None,
            redirects: Redirects::Follow,
            timeouts,
        }
    }

    #[must_use]
    pub fn with_redirects(mut self, redirects: Redirects) -> Self {
        self.redirects = redirects;
        self
    }

    #[must_use]
    pub fn with_cookie_jar(mut self, jar: Arc<Jar>) -> Self {
        self.cookie_jar = Some(jar);
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Builds an HTTP client using shared project policy.
///
/// `purpose` is used only for error messages and logging.
///
/// # Errors
///
/// Returns [`HttpClientError`] when client construction fails.
pub fn build_http_client(
    purpose: &str,
    options: &ClientOptions,
) -> Result<Client, HttpClientError> {
    match try_build_client(options, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some sandboxed environments panic when querying system proxy
            // settings; retry without the system lookup.
            warn!(
                purpose,
                "HTTP client hit system proxy panic; building without system proxy"
            );
            match try_build_client(options, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(HttpClientError::new(
                    purpose,
                    "client construction panicked",
                )),
                Err(BuildClientFailure::Build(error)) => {
                    Err(HttpClientError::new(purpose, error.to_string()))
                }
            }
        }
        Err(BuildClientFailure::Build(error)) => {
            Err(HttpClientError::new(purpose, error.to_string()))
        }
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    options: &ClientOptions,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let options = options.clone();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(options);
        if disable_system_proxy_lookup {
            builder = builder.no_proxy();
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(options: ClientOptions) -> ClientBuilder {
    let policy = match options.redirects {
        Redirects::Follow => redirect::Policy::limited(10),
        Redirects::Manual => redirect::Policy::none(),
    };
    let mut builder = Client::builder()
        .connect_timeout(Duration::from_secs(options.timeouts.connect_secs))
        .timeout(Duration::from_secs(options.timeouts.read_secs))
        .user_agent(options.user_agent)
        .redirect(policy)
        .gzip(true);

    if let Some(jar) = options.cookie_jar {
        builder = builder.cookie_provider(jar);
    }

    builder
}
