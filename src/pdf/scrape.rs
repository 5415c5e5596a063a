//! PDF link discovery on publisher landing pages.
//!
//! Observed places publishers put the fulltext link:
//!
//! | Pattern                              | Seen on              |
//! |--------------------------------------|----------------------|
//! | `<meta name="citation_pdf_url">`     | IOP, most Highwire   |
//! | `<a id="download-pdf">`              | Nature (newer)       |
//! | `<a class="download-pdf">`           | Nature (older)       |
//! | `<a class="pdf">`                    | AIP                  |
//!
//! The first matching tag in document order wins.

use futures_util::StreamExt;
use reqwest::Response;
use tracing::debug;
use url::Url;

use crate::html::{StartTag, TagScanner};

use super::FetchError;

/// Streams a page and stops at the first PDF link.
#[derive(Debug, Default)]
pub struct PdfLinkScraper {
    scanner: TagScanner,
    found: Option<String>,
}

impl PdfLinkScraper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the next chunk; returns `true` once a link has been found.
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        if self.found.is_some() {
            return true;
        }
        self.found = self
            .scanner
            .feed(chunk)
            .iter()
            .find_map(link_from_tag)
            .map(str::to_string);
        self.found.is_some()
    }

    /// The raw (possibly relative) link, if one was seen.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        self.found
    }
}

fn link_from_tag(tag: &StartTag) -> Option<&str> {
    let link = match tag.name.as_str() {
        "meta" if tag.attr("name") == Some("citation_pdf_url") => tag.attr("content"),
        "a" if tag.attr("id") == Some("download-pdf")
            || tag.has_class("download-pdf")
            || tag.has_class("pdf") =>
        {
            tag.attr("href")
        }
        _ => None,
    };
    link.filter(|link| !link.trim().is_empty())
}

/// Scans a complete page.
#[must_use]
pub fn scrape_pdf_link(html: &str) -> Option<String> {
    let mut scraper = PdfLinkScraper::new();
    scraper.feed(html.as_bytes());
    scraper.finish()
}

/// Reads `response` until a PDF link shows up and resolves it against the
/// page's final URL.
///
/// # Errors
///
/// Returns [`FetchError::Network`] if the body cannot be read, or
/// [`FetchError::RemoteProtocol`] if the link cannot be resolved.
pub async fn scrape_pdf_url(response: Response) -> Result<Option<Url>, FetchError> {
    let page_url = response.url().clone();
    let mut scraper = PdfLinkScraper::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| FetchError::network(page_url.as_str(), e))?;
        if scraper.feed(&chunk) {
            break;
        }
    }

    let Some(link) = scraper.finish() else {
        debug!(page = %page_url, "no PDF link on page");
        return Ok(None);
    };
    let resolved = page_url
        .join(link.trim())
        .map_err(|e| FetchError::protocol(page_url.as_str(), format!("bad PDF link {link:?}: {e}")))?;
    Ok(Some(resolved))
}
