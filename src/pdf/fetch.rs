//! Choosing a PDF URL for a publication and downloading it.
//!
//! Strategies run in a fixed order and the first validated download wins:
//!
//! 1. DOI: follow the DOI resolver's redirect to the publisher landing page,
//!    fetch it through the proxy session and scrape it for a PDF link.
//! 2. Bibcode: ask ADS for its fulltext redirect. ADS always answers, but
//!    the target may be a dead link, so this is only a fallback.
//! 3. arXiv: the preprint PDF, least preferred.
//!
//! A download that turns out not to be a PDF, or an ADS dead link, moves on
//! to the next strategy.

use std::path::Path;

use futures_util::StreamExt;
use reqwest::header::LOCATION;
use reqwest::{Client, StatusCode};
use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::HttpTimeouts;
use crate::http_client::{ClientOptions, Redirects, build_http_client};
use crate::proxy::ProxySession;
use crate::store::Publication;

use super::FetchError;
use super::scrape::scrape_pdf_url;

const PDF_MAGIC: &[u8] = b"%PDF";

/// Identifiers a PDF can be located by.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PdfIdentifiers {
    pub arxiv: Option<String>,
    pub bibcode: Option<String>,
    pub doi: Option<String>,
}

impl From<&Publication> for PdfIdentifiers {
    fn from(publication: &Publication) -> Self {
        Self {
            arxiv: publication.arxiv.clone(),
            bibcode: publication.bibcode.clone(),
            doi: publication.doi.clone(),
        }
    }
}

/// Service endpoints used to turn identifiers into PDF URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfLinks {
    /// Prefix the DOI is appended to; must answer with a redirect.
    pub doi_resolver: String,
    /// Prefix the bibcode is appended to; must answer with a redirect.
    pub ads_fulltext: String,
    /// Prefix of arXiv PDF URLs; `<id>.pdf` is appended.
    pub arxiv_pdf: String,
    /// Host whose 404s mean "ADS has no PDF on file" rather than an error.
    pub ads_dead_link_host: String,
}

impl Default for PdfLinks {
    fn default() -> Self {
        Self {
            doi_resolver: "http://dx.doi.org/".to_string(),
            ads_fulltext:
                "http://adsabs.harvard.edu/cgi-bin/nph-data_query?link_type=ARTICLE&bibcode="
                    .to_string(),
            arxiv_pdf: "http://arxiv.org/pdf/".to_string(),
            ads_dead_link_host: "articles.adsabs.harvard.edu".to_string(),
        }
    }
}

impl PdfLinks {
    /// All services under one base URL, for local testing.
    #[must_use]
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        let host = Url::parse(base)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();
        Self {
            doi_resolver: format!("{base}/doi/"),
            ads_fulltext: format!("{base}/cgi-bin/nph-data_query?link_type=ARTICLE&bibcode="),
            arxiv_pdf: format!("{base}/pdf/"),
            ads_dead_link_host: host,
        }
    }

    fn doi_url(&self, doi: &str) -> String {
        format!("{}{}", self.doi_resolver, quote_path(doi))
    }

    fn ads_url(&self, bibcode: &str) -> String {
        format!("{}{}", self.ads_fulltext, urlencoding::encode(bibcode))
    }

    fn arxiv_url(&self, arxiv: &str) -> String {
        format!("{}{}.pdf", self.arxiv_pdf, quote_path(arxiv))
    }
}

/// Percent-encodes an identifier for use in a URL path, keeping `/`.
fn quote_path(text: &str) -> String {
    text.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Strategy {
    Doi,
    AdsFulltext,
    Arxiv,
}

/// Locates and downloads PDFs.
#[derive(Debug, Clone)]
pub struct PdfFetcher {
    links: PdfLinks,
    redirect_client: Client,
}

impl PdfFetcher {
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the redirect-lookup client cannot be
    /// built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, FetchError> {
        let options = ClientOptions::new(timeouts).with_redirects(Redirects::Manual);
        Ok(Self {
            links: PdfLinks::default(),
            redirect_client: build_http_client("redirect lookup", &options)?,
        })
    }

    #[must_use]
    pub fn with_links(mut self, links: PdfLinks) -> Self {
        self.links = links;
        self
    }

    /// Downloads a PDF for `ids` to `dest`, returning its SHA-256 hex digest.
    ///
    /// Returns `Ok(None)` when no strategy produced a PDF; `dest` is then
    /// absent.
    ///
    /// # Errors
    ///
    /// Redirect lookups that do not redirect, HTTP error statuses (other than
    /// an ADS dead link), proxy failures and local I/O failures propagate.
    #[instrument(skip(self, session, dest))]
    pub async fn try_fetch(
        &self,
        session: &ProxySession,
        dest: &Path,
        ids: &PdfIdentifiers,
    ) -> Result<Option<String>, FetchError> {
        for strategy in [Strategy::Doi, Strategy::AdsFulltext, Strategy::Arxiv] {
            let Some(url) = self.candidate(strategy, session, ids).await? else {
                continue;
            };
            info!(?strategy, %url, "trying PDF URL");

            match download_pdf(session, &url, dest, &self.links.ads_dead_link_host).await {
                Ok(Some(hash)) => return Ok(Some(hash)),
                Ok(None) => {}
                Err(FetchError::NotPdf { url }) => {
                    warn!(%url, "response does not seem to be a PDF");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    async fn candidate(
        &self,
        strategy: Strategy,
        session: &ProxySession,
        ids: &PdfIdentifiers,
    ) -> Result<Option<String>, FetchError> {
        match strategy {
            Strategy::Doi => match &ids.doi {
                Some(doi) => self.scrape_publisher_page(session, doi).await,
                None => Ok(None),
            },
            Strategy::AdsFulltext => match &ids.bibcode {
                Some(bibcode) => {
                    let target = self.redirect_target(&self.links.ads_url(bibcode)).await?;
                    // ADS entity-encodes the ampersands in its Location header.
                    Ok(Some(target.replace("&amp;", "&")))
                }
                None => Ok(None),
            },
            Strategy::Arxiv => Ok(ids.arxiv.as_deref().map(|id| self.links.arxiv_url(id))),
        }
    }

    async fn scrape_publisher_page(
        &self,
        session: &ProxySession,
        doi: &str,
    ) -> Result<Option<String>, FetchError> {
        let landing = self.redirect_target(&self.links.doi_url(doi)).await?;
        debug!(%landing, "scraping publisher page");

        let response = session.open(&landing).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus {
                url: response.url().to_string(),
                status: status.as_u16(),
            });
        }
        let found = scrape_pdf_url(response).await?;
        Ok(found.map(|url| session.unmangle(url.as_str())))
    }

    /// Returns the `Location` of a redirect, resolved against `url`.
    ///
    /// Lookups go out directly; they only touch public information.
    async fn redirect_target(&self, url: &str) -> Result<String, FetchError> {
        let response = self
            .redirect_client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::network(url, e))?;

        let status = response.status();
        let is_redirect = matches!(
            status,
            StatusCode::MOVED_PERMANENTLY
                | StatusCode::FOUND
                | StatusCode::SEE_OTHER
                | StatusCode::TEMPORARY_REDIRECT
        );
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|_| is_redirect)
            .ok_or_else(|| {
                FetchError::protocol(url, format!("expected a redirection, got HTTP {status}"))
            })?;

        match response.url().join(location) {
            Ok(target) => Ok(target.to_string()),
            Err(_) => Ok(location.to_string()),
        }
    }
}

/// Downloads `url` through `session` into `dest` if it is a PDF.
///
/// Returns the SHA-256 hex digest of the body, or `Ok(None)` for a 404 from
/// `dead_link_host`. When the body does not start with `%PDF` or the
/// transfer fails, `dest` is removed.
///
/// # Errors
///
/// Returns [`FetchError::NotPdf`] for non-PDF content, [`FetchError::HttpStatus`]
/// for other error statuses, and network or I/O errors as they happen.
pub async fn download_pdf(
    session: &ProxySession,
    url: &str,
    dest: &Path,
    dead_link_host: &str,
) -> Result<Option<String>, FetchError> {
    let response = session.open(url).await?;
    let status = response.status();

    if status == StatusCode::NOT_FOUND && host_of(url).as_deref() == Some(dead_link_host) {
        warn!(url, "ADS does not actually have the PDF on file");
        return Ok(None);
    }
    if !status.is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = File::create(dest)
        .await
        .map_err(|e| FetchError::io(dest, e))?;
    let result = stream_validated(&mut file, response, url, dest).await;
    drop(file);

    if result.is_err() {
        debug!(path = %dest.display(), "removing rejected download");
        let _ = tokio::fs::remove_file(dest).await;
    }
    result.map(Some)
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_string))
}

/// Writes the body to `file` while hashing it, checking the magic bytes
/// before anything is written.
async fn stream_validated(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<String, FetchError> {
    let mut writer = BufWriter::new(file);
    let mut hasher = Sha256::new();
    let mut head: Vec<u8> = Vec::with_capacity(PDF_MAGIC.len());
    let mut validated = false;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| FetchError::network(url, e))?;

        let data: &[u8] = if validated {
            &chunk
        } else {
            head.extend_from_slice(&chunk);
            if head.len() < PDF_MAGIC.len() {
                continue;
            }
            if !head.starts_with(PDF_MAGIC) {
                return Err(FetchError::NotPdf {
                    url: url.to_string(),
                });
            }
            validated = true;
            &head
        };

        hasher.update(data);
        writer
            .write_all(data)
            .await
            .map_err(|e| FetchError::io(path, e))?;
    }

    if !validated {
        return Err(FetchError::NotPdf {
            url: url.to_string(),
        });
    }

    writer
        .flush()
        .await
        .map_err(|e| FetchError::io(path, e))?;

    Ok(format!("{:x}", hasher.finalize()))
}
