//! Cookie-backed HTTP session through an institutional `EZproxy`-style proxy.
//!
//! Publisher hosts are reached by appending the proxy suffix to their host
//! name (`iopscience.iop.org` becomes `iopscience.iop.org.ezp.example.edu`).
//! The first proxied request usually lands on the institution's login page;
//! the session scrapes the form, posts the configured credentials and follows
//! the redirect back to the target. Some proxies first bounce through a
//! cookie-setting "forward" page after which the original request has to be
//! repeated. See [`ProxyState`] for the full flow.
//!
//! Without a `[proxy]` configuration every request goes out directly.

mod error;
mod login;
mod state;

pub use error::ProxyError;
pub use login::{LoginForm, LoginPageParser};
pub use state::{Action, Landing, ProxyState, Transition};

use std::sync::Arc;

use futures_util::StreamExt;
use reqwest::cookie::Jar;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response};
use tracing::{debug, info, instrument};
use url::Url;

use crate::config::HttpTimeouts;
use crate::http_client::{ClientOptions, build_http_client};

/// Proxy endpoints and credentials, from the `[proxy]` config section.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Appended to every proxied host name, leading dot included.
    pub suffix: String,
    /// Responses whose URL starts with this are login pages.
    pub login_url: String,
    /// Responses whose URL starts with this are cookie-setting forward pages.
    pub forward_url: String,
    pub username: String,
    pub password: String,
    pub user_agent: String,
    /// Extra login form fields, applied after the page's own inputs.
    pub extra_inputs: Vec<(String, String)>,
    /// Host suffixes that are always requested directly.
    pub exempt_hosts: Vec<String>,
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("suffix", &self.suffix)
            .field("login_url", &self.login_url)
            .field("forward_url", &self.forward_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("exempt_hosts", &self.exempt_hosts)
            .finish_non_exhaustive()
    }
}

impl ProxyConfig {
    fn is_exempt(&self, host: &str) -> bool {
        self.exempt_hosts
            .iter()
            .any(|exempt| host.ends_with(exempt.as_str()))
    }

    /// Inputs posted over the page's own: extras, then the credentials.
    fn credential_inputs(&self) -> Vec<(String, String)> {
        let mut inputs = self.extra_inputs.clone();
        inputs.push(("username".to_string(), self.username.clone()));
        inputs.push(("password".to_string(), self.password.clone()));
        inputs
    }
}

/// A cookie-backed session, owned by one caller at a time.
#[derive(Debug)]
pub struct ProxySession {
    client: Client,
    config: Option<ProxyConfig>,
}

impl ProxySession {
    /// Creates a session; `None` makes every request direct.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::Client`] if the HTTP client cannot be built.
    pub fn new(config: Option<ProxyConfig>, timeouts: HttpTimeouts) -> Result<Self, ProxyError> {
        let mut options = ClientOptions::new(timeouts).with_cookie_jar(Arc::new(Jar::default()));
        if let Some(config) = &config {
            options = options.with_user_agent(config.user_agent.clone());
        }
        let client = build_http_client("proxy session", &options)?;
        Ok(Self { client, config })
    }

    /// Returns `true` when a proxy is configured.
    #[must_use]
    pub fn is_proxied(&self) -> bool {
        self.config.is_some()
    }

    /// Returns the proxy-rewritten form of `url`, or `None` when it is
    /// requested directly.
    #[must_use]
    pub fn proxied_url(&self, url: &Url) -> Option<Url> {
        let config = self.config.as_ref()?;
        let host = url.host_str()?;
        if config.is_exempt(host) {
            return None;
        }
        let mut proxied = url.clone();
        proxied
            .set_host(Some(&format!("{host}{}", config.suffix)))
            .ok()?;
        Some(proxied)
    }

    /// Fetches `url`, logging in to the proxy if it asks.
    ///
    /// The response is returned whatever its status; callers decide which
    /// statuses they can live with.
    ///
    /// # Errors
    ///
    /// Returns a [`ProxyError`] for unparsable URLs, transport failures, a
    /// malformed or non-posting login page, or a rejected login.
    #[instrument(skip(self))]
    pub async fn open(&self, url: &str) -> Result<Response, ProxyError> {
        let target = Url::parse(url).map_err(|e| ProxyError::invalid_url(url, e))?;
        let (request_url, mut state) = match self.proxied_url(&target) {
            Some(proxied) => (proxied, ProxyState::Proxied),
            None => (target, ProxyState::Direct),
        };

        let mut response = self.get(&request_url).await?;
        loop {
            let landing = match &self.config {
                Some(config) => Landing::classify(
                    response.url().as_str(),
                    &config.login_url,
                    &config.forward_url,
                ),
                None => Landing::Target,
            };
            let transition = state.on_landing(landing, request_url.as_str())?;
            debug!(from = ?state, to = ?transition.next, action = ?transition.action, "proxy step");
            state = transition.next;

            response = match transition.action {
                Action::SubmitLogin => self.login(response).await?,
                Action::Repeat => self.get(&request_url).await?,
                Action::Finish => return Ok(response),
            };
        }
    }

    /// Strips the proxy suffix from a URL's host, if present.
    #[must_use]
    pub fn unmangle(&self, url: &str) -> String {
        match &self.config {
            Some(config) => unmangle(url, &config.suffix),
            None => url.to_string(),
        }
    }

    /// The session's underlying client (shares the cookie jar).
    #[must_use]
    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn get(&self, url: &Url) -> Result<Response, ProxyError> {
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| ProxyError::network(url.as_str(), e))
    }

    async fn login(&self, response: Response) -> Result<Response, ProxyError> {
        let page_url = response.url().clone();
        let Some(config) = &self.config else {
            return Ok(response);
        };

        let mut parser = LoginPageParser::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ProxyError::network(page_url.as_str(), e))?;
            parser.feed(&chunk)?;
        }
        let form = parser.finish(page_url.as_str())?;

        let post_url = page_url
            .join(&form.action)
            .map_err(|e| ProxyError::invalid_url(&form.action, e))?;
        info!(host = post_url.host_str().unwrap_or_default(), "logging in to proxy");

        self.client
            .post(post_url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(form.encode_body(&config.credential_inputs()))
            .send()
            .await
            .map_err(|e| ProxyError::network(post_url.as_str(), e))
    }
}

/// Strips `suffix` from the host of `url`; other URLs come back unchanged.
#[must_use]
pub fn unmangle(url: &str, suffix: &str) -> String {
    if suffix.is_empty() {
        return url.to_string();
    }
    let Ok(mut parsed) = Url::parse(url) else {
        return url.to_string();
    };
    let Some(host) = parsed
        .host_str()
        .and_then(|host| host.strip_suffix(suffix))
        .filter(|host| !host.is_empty())
        .map(str::to_string)
    else {
        return url.to_string();
    };
    if parsed.set_host(Some(&host)).is_err() {
        return url.to_string();
    }
    parsed.to_string()
}
