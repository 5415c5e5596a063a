//! Ordered pattern classification of publication references.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::trace;

use super::names::normalize_surname;

/// `10.<registrant>/<suffix>`
#[allow(clippy::expect_used)]
static DOI_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^10\.\d+/").expect("DOI regex is valid")); // Static pattern, safe to panic

/// Four-digit year followed by the journal code, e.g. `1998ApJ...500..525S`.
#[allow(clippy::expect_used)]
static BIBCODE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}[a-zA-Z0-9&]+").expect("bibcode regex is valid") // Static pattern, safe to panic
});

/// New-style arXiv identifier: `YYMM.NNNN+`.
#[allow(clippy::expect_used)]
static ARXIV_NEW_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d\d[01]\d\.\d+").expect("arXiv regex is valid") // Static pattern, safe to panic
});

/// Old-style arXiv identifier: `category/NNNNNNN`.
#[allow(clippy::expect_used)]
static ARXIV_OLD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z-]+/\d+").expect("arXiv regex is valid") // Static pattern, safe to panic
});

/// `<surname>.<year>` or `<surname>.*`.
#[allow(clippy::expect_used)]
static NFASY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\.(\d+|\*)$").expect("surname.year regex is valid") // Static pattern, safe to panic
});

/// The kind of identifier a reference string carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Doi,
    Bibcode,
    Arxiv,
    Nickname,
    /// Normalized first-author surname plus year (or `*`).
    Nfasy,
}

impl RefKind {
    /// Returns the stable lowercase label for this kind.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Doi => "doi",
            Self::Bibcode => "bibcode",
            Self::Arxiv => "arxiv",
            Self::Nickname => "nickname",
            Self::Nfasy => "nfasy",
        }
    }
}

impl fmt::Display for RefKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reference string after classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRef {
    pub kind: RefKind,
    /// The identifier with any `doi:`/`arxiv:` prefix removed; for
    /// [`RefKind::Nfasy`] the surname part is normalized.
    pub text: String,
}

impl ClassifiedRef {
    fn new(kind: RefKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Splits an [`RefKind::Nfasy`] text into its surname and year parts.
    ///
    /// Returns `None` for other kinds.
    #[must_use]
    pub fn nfas_and_year(&self) -> Option<(&str, &str)> {
        if self.kind != RefKind::Nfasy {
            return None;
        }
        self.text.rsplit_once('.')
    }
}

/// Classifies a publication reference.
///
/// Rules are tried in a fixed order and the first match wins; the patterns
/// overlap, so the order decides ambiguous inputs:
///
/// 1. `doi:` prefix
/// 2. DOI shape
/// 3. bibcode shape
/// 4. arXiv shapes (new style, then old style)
/// 5. `arxiv:` prefix
/// 6. `<surname>.<year>` / `<surname>.*`
/// 7. anything else is a nickname
///
/// # Examples
///
/// ```
/// use bibtools_core::parser::{RefKind, classify_reference};
///
/// assert_eq!(classify_reference("10.1086/305772").kind, RefKind::Doi);
/// assert_eq!(classify_reference("arxiv:1234.5678").text, "1234.5678");
/// assert_eq!(classify_reference("smith.*").kind, RefKind::Nfasy);
/// ```
#[must_use]
pub fn classify_reference(text: &str) -> ClassifiedRef {
    let classified = classify_inner(text);
    trace!(input = text, kind = %classified.kind, text = %classified.text, "classified reference");
    classified
}

fn classify_inner(text: &str) -> ClassifiedRef {
    if let Some(rest) = text.strip_prefix("doi:") {
        return ClassifiedRef::new(RefKind::Doi, rest);
    }

    if DOI_PATTERN.is_match(text) {
        return ClassifiedRef::new(RefKind::Doi, text);
    }

    if BIBCODE_PATTERN.is_match(text) {
        return ClassifiedRef::new(RefKind::Bibcode, text);
    }

    if ARXIV_NEW_PATTERN.is_match(text) || ARXIV_OLD_PATTERN.is_match(text) {
        return ClassifiedRef::new(RefKind::Arxiv, text);
    }

    if let Some(rest) = text.strip_prefix("arxiv:") {
        return ClassifiedRef::new(RefKind::Arxiv, rest);
    }

    // Open-ended; must stay below every identifier shape.
    if NFASY_PATTERN.is_match(text)
        && let Some((surname, year)) = text.rsplit_once('.')
    {
        return ClassifiedRef::new(
            RefKind::Nfasy,
            format!("{}.{year}", normalize_surname(surname)),
        );
    }

    ClassifiedRef::new(RefKind::Nickname, text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_and_text(input: &str) -> (RefKind, String) {
        let classified = classify_reference(input);
        (classified.kind, classified.text)
    }

    #[test]
    fn test_classify_bare_doi() {
        assert_eq!(
            kind_and_text("10.1086/305772"),
            (RefKind::Doi, "10.1086/305772".to_string())
        );
    }

    #[test]
    fn test_classify_doi_prefix_is_stripped() {
        assert_eq!(
            kind_and_text("doi:10.1086/305772"),
            (RefKind::Doi, "10.1086/305772".to_string())
        );
    }

    #[test]
    fn test_classify_doi_prefix_wins_over_everything() {
        // Not DOI-shaped after stripping, but the prefix rule comes first.
        assert_eq!(
            kind_and_text("doi:smith.2020"),
            (RefKind::Doi, "smith.2020".to_string())
        );
    }

    #[test]
    fn test_classify_bibcode() {
        assert_eq!(
            kind_and_text("1998ApJ...500..525S"),
            (RefKind::Bibcode, "1998ApJ...500..525S".to_string())
        );
    }

    #[test]
    fn test_classify_new_style_arxiv() {
        assert_eq!(
            kind_and_text("1401.2345"),
            (RefKind::Arxiv, "1401.2345".to_string())
        );
        assert_eq!(
            kind_and_text("0912.12345v2"),
            (RefKind::Arxiv, "0912.12345v2".to_string())
        );
    }

    #[test]
    fn test_classify_old_style_arxiv() {
        assert_eq!(
            kind_and_text("astro-ph/0701001"),
            (RefKind::Arxiv, "astro-ph/0701001".to_string())
        );
    }

    #[test]
    fn test_classify_arxiv_prefix_is_stripped() {
        assert_eq!(
            kind_and_text("arxiv:1234.5678"),
            (RefKind::Arxiv, "1234.5678".to_string())
        );
    }

    #[test]
    fn test_classify_bibcode_shape_beats_arxiv_shape() {
        // Four leading digits followed by a journal-code character.
        assert_eq!(kind_and_text("2001A&A...365L...1J").0, RefKind::Bibcode);
    }

    #[test]
    fn test_classify_surname_year() {
        assert_eq!(
            kind_and_text("smith.2020"),
            (RefKind::Nfasy, "smith.2020".to_string())
        );
    }

    #[test]
    fn test_classify_surname_wildcard_year() {
        assert_eq!(
            kind_and_text("smith.*"),
            (RefKind::Nfasy, "smith.*".to_string())
        );
    }

    #[test]
    fn test_classify_surname_is_normalized() {
        assert_eq!(
            kind_and_text("Müller-Schmidt.1999"),
            (RefKind::Nfasy, "muller.schmidt.1999".to_string())
        );
    }

    #[test]
    fn test_classify_nickname_is_unchanged() {
        assert_eq!(
            kind_and_text("MyFavoritePaper"),
            (RefKind::Nickname, "MyFavoritePaper".to_string())
        );
        assert_eq!(
            kind_and_text("smith.draft"),
            (RefKind::Nickname, "smith.draft".to_string())
        );
    }

    #[test]
    fn test_classify_doi_prefix_is_transparent_for_doi_shapes() {
        for doi in [
            "10.1086/305772",
            "10.1038/s41586-024-07386-0",
            "10.1016/j.cell.2024.01.001",
            "10.1007/978-3-642-14335-9_1",
        ] {
            let bare = classify_reference(doi);
            let prefixed = classify_reference(&format!("doi:{doi}"));
            assert_eq!(bare.kind, RefKind::Doi);
            assert_eq!(bare, prefixed, "prefix changed classification of {doi}");
        }
    }

    #[test]
    fn test_nfas_and_year_split() {
        let classified = classify_reference("de la cruz.2011");
        assert_eq!(classified.nfas_and_year(), Some(("de.la.cruz", "2011")));

        assert_eq!(classify_reference("10.1/x").nfas_and_year(), None);
    }

    #[test]
    fn test_ref_kind_display() {
        assert_eq!(RefKind::Nfasy.to_string(), "nfasy");
        assert_eq!(RefKind::Doi.as_str(), "doi");
    }
}
