//! Crossref `UnixRef` ingester for DOIs.
//!
//! Only journal articles are understood: the record must contain
//! `doi_record/crossref/journal`. Below that element every field is read
//! independently and dropped when it is missing or malformed.

use std::collections::BTreeMap;

use reqwest::Client;
use tracing::{debug, instrument};

use crate::parser::encode_name;
use crate::store::PubFields;

use super::xml::{Element, parse_document};
use super::{LearnError, endpoint_url, fetch_bytes};

pub(crate) const SERVICE: &str = "Crossref";

/// Fetches the `UnixRef` record for `doi`.
#[instrument(skip(client, pid), fields(service = SERVICE))]
pub(crate) async fn fetch_record(
    client: &Client,
    base_url: &str,
    pid: &str,
    doi: &str,
) -> Result<PubFields, LearnError> {
    let url = endpoint_url(
        SERVICE,
        base_url,
        &[
            ("id", doi),
            ("noredirect", "true"),
            ("pid", pid),
            ("format", "unixref"),
        ],
    )?;
    debug!(doi, "fetching Crossref UnixRef record");
    let bytes = fetch_bytes(client, url.as_str()).await?;
    parse_unixref(doi, &String::from_utf8_lossy(&bytes))
}

/// Extracts a field set from a `UnixRef` document.
///
/// # Errors
///
/// Returns [`LearnError::RemoteProtocol`] when the document is not XML or has
/// no `<journal>` record.
pub fn parse_unixref(doi: &str, xml: &str) -> Result<PubFields, LearnError> {
    let root = parse_document(xml).map_err(|e| LearnError::xml(SERVICE, &e))?;
    let journal = root.find("doi_record/crossref/journal").ok_or_else(|| {
        LearnError::protocol(
            SERVICE,
            format!("no <journal> element in UnixRef XML for {doi}"),
        )
    })?;

    let mut fields = PubFields {
        doi: Some(doi.to_string()),
        ..PubFields::default()
    };

    for person in journal.find_all("journal_article/contributors/person_name") {
        let Some(name) = translate_person(person) else {
            continue;
        };
        if person.attr("contributor_role") == Some("editor") {
            fields.editors.push(name);
        } else {
            fields.authors.push(name);
        }
    }

    fields.title = journal.find("journal_article/titles/title").map(|title| {
        title
            .itertext()
            .into_iter()
            .map(str::trim)
            .filter(|piece| !piece.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    });

    fields.year = journal
        .find_text("journal_issue/publication_date/year")
        .and_then(|year| year.parse().ok());

    fields.refdata = refdata(journal);
    Ok(fields)
}

fn translate_person(person: &Element) -> Option<String> {
    let surname = person.find_text("surname")?;
    let given = person.find_text("given_name").unwrap_or_default();
    Some(encode_name(&given, &surname))
}

fn refdata(journal: &Element) -> Option<BTreeMap<String, String>> {
    let mut refdata = BTreeMap::new();
    let mut put = |key: &str, value: Option<String>| {
        if let Some(value) = value {
            refdata.insert(key.to_string(), value);
        }
    };

    put("journal", journal.find_text("journal_metadata/full_title"));
    put("issn", journal.find_text("journal_metadata/issn"));
    put(
        "volume",
        journal.find_text("journal_issue/journal_volume/volume"),
    );
    put("issue", journal.find_text("journal_issue/issue"));
    put(
        "pages",
        journal
            .find_text("journal_article/pages/first_page")
            .map(|first| {
                match journal.find_text("journal_article/pages/last_page") {
                    Some(last) => format!("{first}-{last}"),
                    None => first,
                }
            }),
    );

    if refdata.is_empty() {
        return None;
    }
    refdata.insert("_type".to_string(), "article".to_string());
    Some(refdata)
}
