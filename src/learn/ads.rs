//! ADS "portable" tagged-record ingester.
//!
//! The portable format is line oriented:
//!
//! ```text
//! Query Results from the ADS Database
//!
//! Retrieved 1 abstracts, starting with number 1.  Total number selected: 1.
//!
//! %R 1998ApJ...500..525S
//! %T Maps of Dust Infrared Emission for Use in Estimation
//!    of Reddening and Cosmic Microwave Background Radiation Foregrounds
//! %D 06/1998
//! ```
//!
//! `%X` starts tag `X`, any other line extends the open tag, and a blank line
//! closes it. [`PortableParser`] holds that as a two-state machine so it can
//! be driven line by line without the network.

use std::collections::BTreeMap;

use reqwest::Client;
use tracing::{debug, instrument};
use url::Url;

use crate::parser::translate_ads_name;
use crate::store::PubFields;

use super::{LearnError, endpoint_url, fetch_bytes};

pub(crate) const SERVICE: &str = "ADS";

const SELECTED_MARKER: &str = "selected:";
const NO_MATCH_PREFIX: &str = "Retrieved 0 abstracts";

#[derive(Debug, Clone, PartialEq, Eq)]
enum ParserState {
    OutsideRecord,
    InsideTag { tag: char, text: String },
}

/// Incremental parser for one portable-format response.
#[derive(Debug)]
pub struct PortableParser {
    state: ParserState,
    tags: Vec<(char, String)>,
}

impl Default for PortableParser {
    fn default() -> Self {
        Self::new()
    }
}

impl PortableParser {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: ParserState::OutsideRecord,
            tags: Vec::new(),
        }
    }

    /// Feeds one line; surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::RemoteProtocol`] when the `Retrieved` footer
    /// reports more than one matching record or cannot be read.
    pub fn feed_line(&mut self, line: &str) -> Result<(), LearnError> {
        let line = line.trim();

        if line.is_empty() {
            self.close_tag();
            return Ok(());
        }

        if let Some((tag, text)) = split_tag_line(line) {
            self.close_tag();
            self.state = ParserState::InsideTag {
                tag,
                text: text.to_string(),
            };
            return Ok(());
        }

        match &mut self.state {
            ParserState::InsideTag { text, .. } => {
                text.push(' ');
                text.push_str(line);
            }
            ParserState::OutsideRecord => {
                if line.starts_with("Retrieved ") {
                    check_selected_count(line)?;
                }
            }
        }
        Ok(())
    }

    /// Closes any open tag and maps the collected tags to a field set.
    ///
    /// # Errors
    ///
    /// Returns [`LearnError::RemoteProtocol`] when the `%D` date does not end
    /// in a numeric year.
    pub fn finish(mut self, bibcode: &str) -> Result<PubFields, LearnError> {
        self.close_tag();

        let mut fields = PubFields {
            bibcode: Some(bibcode.to_string()),
            ..PubFields::default()
        };
        let mut refdata = BTreeMap::new();

        for (tag, text) in self.tags {
            match tag {
                'T' => fields.title = Some(text),
                'D' => fields.year = Some(parse_year(&text)?),
                'B' => fields.abstract_text = Some(text),
                'A' => fields.authors = split_names(&text),
                'E' => fields.editors = split_names(&text),
                'Y' => apply_identifiers(&mut fields, &text),
                'J' => {
                    refdata.insert("journal".to_string(), text);
                }
                'V' => {
                    refdata.insert("volume".to_string(), text);
                }
                'P' => {
                    refdata.insert("pages".to_string(), text);
                }
                _ => {}
            }
        }

        if !refdata.is_empty() {
            refdata.insert("_type".to_string(), "article".to_string());
            fields.refdata = Some(refdata);
        }
        Ok(fields)
    }

    fn close_tag(&mut self) {
        if let ParserState::InsideTag { tag, text } =
            std::mem::replace(&mut self.state, ParserState::OutsideRecord)
        {
            self.tags.push((tag, text));
        }
    }
}

/// Parses a whole portable-format body.
///
/// # Errors
///
/// See [`PortableParser::feed_line`] and [`PortableParser::finish`].
pub fn parse_portable(bibcode: &str, body: &str) -> Result<PubFields, LearnError> {
    let mut parser = PortableParser::new();
    for line in body.lines() {
        parser.feed_line(line)?;
    }
    parser.finish(bibcode)
}

/// Fetches and parses the portable record for `bibcode`.
#[instrument(skip(client, dev_key), fields(service = SERVICE))]
pub(crate) async fn fetch_record(
    client: &Client,
    base_url: &str,
    dev_key: &str,
    bibcode: &str,
) -> Result<PubFields, LearnError> {
    let url = endpoint_url(
        SERVICE,
        base_url,
        &[
            ("data_type", "PORTABLE"),
            ("nocookieset", "1"),
            ("bibcode", bibcode),
            ("dev_key", dev_key),
        ],
    )?;
    debug!(url = %redacted(&url), "fetching ADS portable record");
    let body = decode_latin1(&fetch_bytes(client, url.as_str()).await?);
    parse_portable(bibcode, &body)
}

/// Asks ADS for the bibcode of the record carrying `doi`.
///
/// Returns `None` when ADS knows no such record.
#[instrument(skip(client, dev_key), fields(service = SERVICE))]
pub(crate) async fn doi_to_maybe_bibcode(
    client: &Client,
    base_url: &str,
    dev_key: &str,
    doi: &str,
) -> Result<Option<String>, LearnError> {
    let url = endpoint_url(
        SERVICE,
        base_url,
        &[
            ("data_type", "Custom"),
            ("format", "%R"),
            ("nocookieset", "1"),
            ("doi", doi),
            ("dev_key", dev_key),
        ],
    )?;
    let body = decode_latin1(&fetch_bytes(client, url.as_str()).await?);
    let bibcode = last_bibcode_line(&body);
    debug!(?bibcode, "DOI to bibcode lookup");
    Ok(bibcode)
}

fn last_bibcode_line(body: &str) -> Option<String> {
    body.lines()
        .map(str::trim)
        .rfind(|line| !line.is_empty())
        .filter(|line| !line.starts_with(NO_MATCH_PREFIX))
        .map(str::to_string)
}

fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            let value = if key == "dev_key" {
                "***".to_string()
            } else {
                value.into_owned()
            };
            (key.into_owned(), value)
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

/// ADS serves ISO-8859-1; every byte maps to the code point of equal value.
fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn split_tag_line(line: &str) -> Option<(char, &str)> {
    let mut chars = line.chars();
    if chars.next() != Some('%') {
        return None;
    }
    let tag = chars.next()?;
    // One separator column follows the tag letter.
    chars.next();
    Some((tag, chars.as_str()))
}

fn check_selected_count(line: &str) -> Result<(), LearnError> {
    let count = line
        .rsplit_once(SELECTED_MARKER)
        .map(|(_, rest)| rest.trim().trim_end_matches('.'))
        .and_then(|count| count.parse::<u64>().ok())
        .ok_or_else(|| LearnError::protocol(SERVICE, format!("unreadable footer \"{line}\"")))?;

    if count > 1 {
        return Err(LearnError::protocol(
            SERVICE,
            format!("query matched {count} publications, expected one"),
        ));
    }
    Ok(())
}

fn parse_year(text: &str) -> Result<i64, LearnError> {
    let tail = text.rsplit_once('/').map_or(text, |(_, tail)| tail).trim();
    tail.parse()
        .map_err(|_| LearnError::protocol(SERVICE, format!("non-numeric year in date \"{text}\"")))
}

fn split_names(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(translate_ads_name)
        .collect()
}

fn apply_identifiers(fields: &mut PubFields, text: &str) {
    for piece in text.split(';') {
        let Some((key, value)) = piece.trim().split_once(": ") else {
            continue;
        };
        match key {
            "DOI" => fields.doi = Some(value.trim().to_string()),
            "eprintid" => {
                if let Some(arxiv) = value.trim().strip_prefix("arXiv:") {
                    fields.arxiv = Some(arxiv.to_string());
                }
            }
            _ => {}
        }
    }
}
