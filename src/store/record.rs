//! Publication rows and the canonical field set exchanged with ingesters.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A stored publication, as read back from the `pubs` table.
///
/// This is a value copy; changes go back through [`super::Store::update`].
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct Publication {
    pub id: i64,
    #[sqlx(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub arxiv: Option<String>,
    pub bibcode: Option<String>,
    pub doi: Option<String>,
    /// 0 for auto-learned records, nonzero once curated.
    pub keep: i64,
    /// Normalized first-author surname, derived at write time.
    pub nfas: Option<String>,
    /// JSON-encoded publisher fields (journal, volume, pages, `_type`, ...).
    pub refdata: Option<String>,
    pub title: Option<String>,
    pub year: Option<i64>,
}

impl Publication {
    #[must_use]
    pub fn is_kept(&self) -> bool {
        self.keep != 0
    }

    /// Decodes the refdata blob; `None` when absent or not a flat string map.
    #[must_use]
    pub fn refdata_map(&self) -> Option<BTreeMap<String, String>> {
        self.refdata
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

/// The canonical, source-agnostic field set.
///
/// Every ingester produces one of these and the merge step consumes it. The
/// serialized shape (keys `title`, `year`, `abstract`, `authors`, `editors`,
/// `doi`, `bibcode`, `arxiv`, `nicknames`, `refdata`, `keep` as 0/1) is the
/// interchange format for plaintext export and must stay stable.
///
/// Authors and editors are stored-form name strings (see
/// [`crate::parser::encode_name`]); an empty list means "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PubFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i64>,
    #[serde(rename = "abstract", default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub editors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doi: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bibcode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arxiv: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nicknames: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refdata: Option<BTreeMap<String, String>>,
    #[serde(default, with = "keep_flag")]
    pub keep: bool,
}

mod keep_flag {
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)] // signature fixed by serde(with)
    pub fn serialize<S: Serializer>(keep: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*keep))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}

/// Role of a person in an authorship row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorRole {
    Author,
    Editor,
}

impl AuthorRole {
    /// Value of the `authors.type` column.
    #[must_use]
    pub fn as_db(self) -> i64 {
        match self {
            Self::Author => 0,
            Self::Editor => 1,
        }
    }
}

/// Actions recorded in the append-only history log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Read,
    Visit,
}

impl HistoryAction {
    /// Value of the `history.action` column.
    #[must_use]
    pub fn as_db(self) -> i64 {
        match self {
            Self::Read => 1,
            Self::Visit => 2,
        }
    }
}

/// Fields supporting exact-match lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExactField {
    Doi,
    Bibcode,
    Arxiv,
    Nickname,
}

impl fmt::Display for ExactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Doi => "doi",
            Self::Bibcode => "bibcode",
            Self::Arxiv => "arxiv",
            Self::Nickname => "nickname",
        };
        f.write_str(label)
    }
}

/// Year constraint of a surname/year lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    /// The `*` wildcard.
    Any,
    Exact(i64),
}

impl YearFilter {
    /// Parses the year half of a `surname.year` reference.
    ///
    /// Returns `None` for text that is neither `*` nor an integer in range.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        if text == "*" {
            return Some(Self::Any);
        }
        text.parse().ok().map(Self::Exact)
    }
}
