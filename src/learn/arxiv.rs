//! arXiv Atom feed ingester.

use reqwest::Client;
use tracing::{debug, instrument};

use crate::store::PubFields;

use super::xml::parse_document;
use super::{LearnError, endpoint_url, fetch_bytes};

pub(crate) const SERVICE: &str = "arXiv";

/// Fetches the feed entry for `arxiv_id`.
#[instrument(skip(client), fields(service = SERVICE))]
pub(crate) async fn fetch_record(
    client: &Client,
    base_url: &str,
    arxiv_id: &str,
) -> Result<PubFields, LearnError> {
    let url = endpoint_url(SERVICE, base_url, &[("id_list", arxiv_id)])?;
    debug!(url = %url, "fetching arXiv Atom entry");
    let bytes = fetch_bytes(client, url.as_str()).await?;
    parse_atom_entry(arxiv_id, &String::from_utf8_lossy(&bytes))
}

/// Extracts a field set from the first `<entry>` of an Atom feed.
///
/// Author names in the feed are already in "given family" order and are
/// taken as they are.
///
/// # Errors
///
/// Returns [`LearnError::RemoteProtocol`] when the feed is not XML or has no
/// entry.
pub fn parse_atom_entry(arxiv_id: &str, xml: &str) -> Result<PubFields, LearnError> {
    let feed = parse_document(xml).map_err(|e| LearnError::xml(SERVICE, &e))?;
    let entry = feed
        .find("entry")
        .ok_or_else(|| LearnError::protocol(SERVICE, format!("no <entry> in feed for {arxiv_id}")))?;

    Ok(PubFields {
        arxiv: Some(arxiv_id.to_string()),
        abstract_text: entry.find_text("summary"),
        authors: entry
            .find_all("author/name")
            .into_iter()
            .map(|name| name.text().trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        doi: entry.find_text("doi"),
        title: entry.find_text("title"),
        year: entry
            .find_text("published")
            .and_then(|published| published.get(..4).and_then(|year| year.parse().ok())),
        ..PubFields::default()
    })
}
