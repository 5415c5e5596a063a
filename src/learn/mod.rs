//! Autolearning: fetch a publication's metadata from a remote service.
//!
//! Each ingester turns one identifier into a [`PubFields`] value:
//!
//! | kind    | service  | credential        |
//! |---------|----------|-------------------|
//! | bibcode | ADS      | `[api-keys] ads`  |
//! | DOI     | Crossref | `[api-keys] crossref` |
//! | arXiv   | arXiv    | none              |
//!
//! DOIs are first looked up in ADS, whose records are richer; the Crossref
//! route is only used when ADS has no bibcode for the DOI.
//!
//! [`MetadataSource`] is the seam the locator depends on, so tests can
//! substitute a canned source.

mod ads;
mod arxiv;
mod crossref;
mod error;
mod search;
mod xml;

pub use ads::{PortableParser, parse_portable};
pub use arxiv::parse_atom_entry;
pub use crossref::parse_unixref;
pub use error::LearnError;
pub use search::{SearchHit, SearchTerm, parse_search};

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::Config;
use crate::http_client::{ClientOptions, build_http_client};
use crate::parser::{ClassifiedRef, RefKind};
use crate::store::PubFields;

const DEFAULT_ADS_ABS_URL: &str = "http://adsabs.harvard.edu/cgi-bin/nph-abs_connect";
const DEFAULT_CROSSREF_URL: &str = "http://crossref.org/openurl/";
const DEFAULT_ARXIV_URL: &str = "http://export.arxiv.org/api/query";
const DEFAULT_ADS_SEARCH_URL: &str = "http://adslabs.org/adsabs/api/search/";

const ADS_KEY: &str = "ads";
const CROSSREF_KEY: &str = "crossref";

/// A source of canonical field sets for unknown references.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    /// Fetches the field set for a classified reference.
    async fn autolearn(&self, reference: &ClassifiedRef) -> Result<PubFields, LearnError>;
}

/// Base URLs of the remote services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub ads_abs: String,
    pub crossref: String,
    pub arxiv: String,
    pub ads_search: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            ads_abs: DEFAULT_ADS_ABS_URL.to_string(),
            crossref: DEFAULT_CROSSREF_URL.to_string(),
            arxiv: DEFAULT_ARXIV_URL.to_string(),
            ads_search: DEFAULT_ADS_SEARCH_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Points every service at one base URL (for tests with wiremock).
    #[must_use]
    pub fn all_at(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            ads_abs: format!("{base}/cgi-bin/nph-abs_connect"),
            crossref: format!("{base}/openurl/"),
            arxiv: format!("{base}/api/query"),
            ads_search: format!("{base}/adsabs/api/search/"),
        }
    }
}

/// The production [`MetadataSource`]: ADS, Crossref and arXiv over HTTP.
pub struct Autolearner {
    config: Arc<Config>,
    client: Client,
    endpoints: Endpoints,
}

impl std::fmt::Debug for Autolearner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Autolearner")
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl Autolearner {
    /// Creates an autolearner using the public service endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::Client`] if the HTTP client cannot be built.
    pub fn new(config: Arc<Config>) -> Result<Self, LearnError> {
        let client = build_http_client("metadata", &ClientOptions::new(config.timeouts()))?;
        Ok(Self {
            config,
            client,
            endpoints: Endpoints::default(),
        })
    }

    /// Replaces the service endpoints.
    #[must_use]
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Learns a bibcode from its ADS portable record.
    ///
    /// # Errors
    ///
    /// Fails with [`LearnError::Config`] without an `ads` key, or with a
    /// network or protocol error.
    pub async fn learn_bibcode(&self, bibcode: &str) -> Result<PubFields, LearnError> {
        let key = self.config.api_key(ADS_KEY)?;
        ads::fetch_record(&self.client, &self.endpoints.ads_abs, key, bibcode).await
    }

    /// Learns a DOI, preferring the ADS record when ADS knows the DOI.
    ///
    /// # Errors
    ///
    /// Fails with [`LearnError::Config`] without a `crossref` key when the
    /// Crossref route is needed, or with a network or protocol error.
    pub async fn learn_doi(&self, doi: &str) -> Result<PubFields, LearnError> {
        if let Some(bibcode) = self.lookup_bibcode(doi).await {
            debug!(doi, bibcode = %bibcode, "DOI known to ADS; learning bibcode instead");
            return self.learn_bibcode(&bibcode).await;
        }
        let key = self.config.api_key(CROSSREF_KEY)?;
        crossref::fetch_record(&self.client, &self.endpoints.crossref, key, doi).await
    }

    /// Learns an arXiv identifier, adding the ADS bibcode when the entry
    /// carries a DOI that ADS knows.
    ///
    /// # Errors
    ///
    /// Fails with a network or protocol error from the arXiv query.
    pub async fn learn_arxiv(&self, arxiv_id: &str) -> Result<PubFields, LearnError> {
        let mut fields = arxiv::fetch_record(&self.client, &self.endpoints.arxiv, arxiv_id).await?;
        if let Some(doi) = fields.doi.clone() {
            fields.bibcode = self.lookup_bibcode(&doi).await;
        }
        Ok(fields)
    }

    /// Runs an ADS search.
    ///
    /// # Errors
    ///
    /// Fails with [`LearnError::Config`] without an `ads` key,
    /// [`LearnError::InvalidSearch`] for fewer than two terms, or a network
    /// or protocol error.
    pub async fn search_ads(&self, terms: &[SearchTerm]) -> Result<Vec<SearchHit>, LearnError> {
        let key = self.config.api_key(ADS_KEY)?;
        search::search_ads(&self.client, &self.endpoints.ads_search, key, terms).await
    }

    /// Best-effort DOI to bibcode lookup; failures are logged, not raised.
    async fn lookup_bibcode(&self, doi: &str) -> Option<String> {
        let result = match self.config.api_key(ADS_KEY) {
            Ok(key) => {
                ads::doi_to_maybe_bibcode(&self.client, &self.endpoints.ads_abs, key, doi).await
            }
            Err(e) => Err(e.into()),
        };
        match result {
            Ok(bibcode) => bibcode,
            Err(e) => {
                warn!(doi, error = %e, "DOI to bibcode lookup failed");
                None
            }
        }
    }
}

#[async_trait]
impl MetadataSource for Autolearner {
    #[instrument(skip(self), fields(kind = %reference.kind, text = %reference.text))]
    async fn autolearn(&self, reference: &ClassifiedRef) -> Result<PubFields, LearnError> {
        match reference.kind {
            RefKind::Doi => self.learn_doi(&reference.text).await,
            RefKind::Bibcode => self.learn_bibcode(&reference.text).await,
            RefKind::Arxiv => self.learn_arxiv(&reference.text).await,
            RefKind::Nickname | RefKind::Nfasy => Err(LearnError::Unlearnable {
                text: reference.text.clone(),
                kind: reference.kind,
            }),
        }
    }
}

/// Builds `base_url` with `pairs` appended as a form-encoded query.
pub(crate) fn endpoint_url(
    service: &'static str,
    base_url: &str,
    pairs: &[(&str, &str)],
) -> Result<Url, LearnError> {
    let mut url = Url::parse(base_url)
        .map_err(|e| LearnError::protocol(service, format!("invalid endpoint {base_url}: {e}")))?;
    url.query_pairs_mut().extend_pairs(pairs);
    Ok(url)
}

/// GETs `url` and returns the body of a successful response.
pub(crate) async fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>, LearnError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| LearnError::network(url, e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(LearnError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| LearnError::network(url, e))?;
    Ok(body.to_vec())
}
