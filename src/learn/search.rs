//! ADS search shorthand: bare years and one surname.

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::parser::{normalize_surname, parse_name, translate_ads_name};

use super::{LearnError, endpoint_url, fetch_bytes};

const SERVICE: &str = "ADS search";
const MAX_HITS: usize = 20;
const DATABASE_FILTER: &str = "database:astronomy";

/// One parsed search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchTerm {
    Year(i64),
    Surname(String),
}

impl SearchTerm {
    fn to_ads_query(&self) -> String {
        match self {
            Self::Year(year) => format!("year:{year}"),
            Self::Surname(surname) => format!("author:\"{surname}\""),
        }
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub bibcode: String,
    pub title: String,
    /// Normalized surname of the first author, if the hit lists any.
    pub nfas: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    results: SearchResults,
}

#[derive(Debug, Deserialize)]
struct SearchResults {
    #[serde(default)]
    docs: Vec<SearchDoc>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    bibcode: String,
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<String>,
}

/// Parses command-line search words.
///
/// Integers are years. Values below 100 are two-digit years: they land in the
/// current century unless they exceed next year's two-digit value, in which
/// case the previous century is used. At most one other word is accepted and
/// it is taken as a surname.
///
/// # Errors
///
/// Returns [`LearnError::InvalidSearch`] for a second non-numeric word.
pub fn parse_search<S: AsRef<str>>(
    words: &[S],
    this_year: i64,
) -> Result<Vec<SearchTerm>, LearnError> {
    let next_two_digit_year = (this_year + 1) % 100;
    let century = this_year / 100 * 100;

    let mut terms = Vec::new();
    let mut bareword: Option<String> = None;

    for word in words {
        let word = word.as_ref();
        if let Ok(year) = word.parse::<i64>() {
            let year = if year >= 100 {
                year
            } else if year > next_two_digit_year {
                year + century - 100
            } else {
                year + century
            };
            terms.push(SearchTerm::Year(year));
            continue;
        }

        if bareword.is_some() {
            return Err(LearnError::InvalidSearch(
                "searches only support a single bare word".to_string(),
            ));
        }
        bareword = Some(word.to_string());
    }

    if let Some(surname) = bareword {
        terms.push(SearchTerm::Surname(surname));
    }
    Ok(terms)
}

/// Runs an ADS search and returns up to twenty hits.
#[instrument(skip(client, dev_key), fields(service = SERVICE))]
pub(crate) async fn search_ads(
    client: &Client,
    base_url: &str,
    dev_key: &str,
    terms: &[SearchTerm],
) -> Result<Vec<SearchHit>, LearnError> {
    if terms.len() < 2 {
        return Err(LearnError::InvalidSearch(
            "ADS searches require at least two terms".to_string(),
        ));
    }

    let query = terms
        .iter()
        .map(SearchTerm::to_ads_query)
        .collect::<Vec<_>>()
        .join(" ");
    let url = endpoint_url(
        SERVICE,
        base_url,
        &[
            ("q", query.as_str()),
            ("dev_key", dev_key),
            ("filter", DATABASE_FILTER),
        ],
    )?;
    debug!(query = %query, "running ADS search");

    let bytes = fetch_bytes(client, url.as_str()).await?;
    parse_search_response(&bytes)
}

fn parse_search_response(bytes: &[u8]) -> Result<Vec<SearchHit>, LearnError> {
    let response: SearchResponse = serde_json::from_slice(bytes)
        .map_err(|e| LearnError::protocol(SERVICE, format!("invalid JSON: {e}")))?;

    Ok(response
        .results
        .docs
        .into_iter()
        .take(MAX_HITS)
        .map(|doc| SearchHit {
            title: doc
                .title
                .into_iter()
                .next()
                .unwrap_or_else(|| "(no title)".to_string()),
            nfas: doc
                .author
                .first()
                .map(|author| normalize_surname(&parse_name(&translate_ads_name(author)).family)),
            bibcode: doc.bibcode,
        })
        .collect())
}
