//! Properties of reference classification and name handling, checked over
//! a spread of realistic inputs.

use bibtools_core::parser::{encode_name, parse_name};
use bibtools_core::{
    Database, Locator, PubFields, RefKind, Store, classify_reference, normalize_surname,
};

const DOIS: &[&str] = &[
    "10.1086/305772",
    "10.1103/PhysRevLett.116.061102",
    "10.1093/mnras/stw2345",
    "10.48550/arXiv.1706.03762",
    "10.1000/xyz(123)<4>",
];

const SURNAMES: &[&str] = &[
    "Smith",
    "van der Berg",
    "O'Neil",
    "García Márquez",
    "Ångström",
    "Schrödinger-Müller",
    "  spaced  out  ",
    "..dots..",
    "Straße",
    "",
    "李",
];

#[test]
fn test_doi_prefix_is_transparent() {
    for doi in DOIS {
        let bare = classify_reference(doi);
        let prefixed = classify_reference(&format!("doi:{doi}"));
        assert_eq!(bare.kind, RefKind::Doi, "{doi}");
        assert_eq!(bare, prefixed, "{doi}");
    }
}

#[test]
fn test_normalize_surname_is_idempotent() {
    for surname in SURNAMES {
        let once = normalize_surname(surname);
        assert_eq!(normalize_surname(&once), once, "{surname:?}");
        assert!(
            once.chars().all(|c| c.is_ascii_lowercase() || c == '.'),
            "{surname:?} -> {once:?}"
        );
    }
}

#[test]
fn test_encode_parse_round_trip() {
    let pairs = [
        ("John", "Smith"),
        ("Anne Marie", "van der Berg"),
        ("J. R. R.", "Tolkien"),
        ("", "Plato"),
        ("Gabriel", "García Márquez"),
    ];
    for (given, family) in pairs {
        let parsed = parse_name(&encode_name(given, family));
        assert_eq!(parsed.given, given, "{given:?} {family:?}");
        assert_eq!(parsed.family, family, "{given:?} {family:?}");
    }
}

#[test]
fn test_end_to_end_classification() {
    let cases = [
        ("10.1086/305772", RefKind::Doi, "10.1086/305772"),
        ("arxiv:1234.5678", RefKind::Arxiv, "1234.5678"),
        ("smith.2020", RefKind::Nfasy, "smith.2020"),
        ("smith.*", RefKind::Nfasy, "smith.*"),
        ("1998ApJ...500..525S", RefKind::Bibcode, "1998ApJ...500..525S"),
        ("astro-ph/0101001", RefKind::Arxiv, "astro-ph/0101001"),
        ("dustmaps", RefKind::Nickname, "dustmaps"),
    ];
    for (input, kind, text) in cases {
        let classified = classify_reference(input);
        assert_eq!((classified.kind, classified.text.as_str()), (kind, text), "{input}");
    }
}

#[test]
fn test_wildcard_year_matches_every_year() {
    tokio_test::block_on(async {
        let store = Store::new(Database::new_in_memory().await.unwrap());
        for (year, doi) in [(1999, "10.1/a"), (2020, "10.1/b")] {
            store
                .learn(PubFields {
                    year: Some(year),
                    authors: vec!["Jane Smith".to_string()],
                    doi: Some(doi.to_string()),
                    ..PubFields::default()
                })
                .await
                .unwrap();
        }
        store
            .learn(PubFields {
                authors: vec!["Jane Smith".to_string()],
                doi: Some("10.1/undated".to_string()),
                ..PubFields::default()
            })
            .await
            .unwrap();

        let locator = Locator::new(&store);
        assert_eq!(locator.locate_all("smith.*").await.unwrap().len(), 3);
        assert_eq!(locator.locate_all("smith.2020").await.unwrap().len(), 1);
    });
}
