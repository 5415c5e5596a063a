//! Integration tests for autolearning: ingesters, the store and the locator
//! working together against mock metadata services.

use std::sync::Arc;

use bibtools_core::learn::{Endpoints, SearchTerm, parse_portable, parse_unixref};
use bibtools_core::store::AuthorRole;
use bibtools_core::{Autolearner, Config, Database, LearnError, Locator, Store};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::socket_guard::start_mock_server_or_skip;

const PORTABLE_RECORD: &str = "\
%R 1998ApJ...500..525S
%T Maps of Dust Infrared Emission for Use in Estimation of Reddening
   and Cosmic Microwave Background Radiation Foregrounds
%D 06/1998
%A Schlegel, David J.; Finkbeiner, Douglas P.; Davis, Marc
%J The Astrophysical Journal, Volume 500, Issue 2, pp. 525-553.
%V 500
%P 525
%Y DOI: 10.1086/305772

Retrieved 1 abstracts, starting with number 1.  Total number selected: 1.
";

fn learner(server: &MockServer, config: Config) -> Autolearner {
    Autolearner::new(Arc::new(config))
        .unwrap()
        .with_endpoints(Endpoints::all_at(&server.uri()))
}

async fn empty_store() -> Store {
    Store::new(Database::new_in_memory().await.unwrap())
}

#[test]
fn test_portable_continuation_line_joins_title() {
    let fields = parse_portable(
        "2000X....1....1A",
        "%R 2000X....1....1A\n%T Some Title\nmore text\n\n",
    )
    .unwrap();
    assert_eq!(fields.title.as_deref(), Some("Some Title more text"));
}

#[test]
fn test_portable_footer_counts() {
    let err = parse_portable("2000X....1....1A", "Retrieved 2 selected: 2.\n").unwrap_err();
    assert!(err.is_remote_protocol());
    assert!(parse_portable("2000X....1....1A", "Retrieved 0 selected: 0.\n").is_ok());
}

#[test]
fn test_unixref_without_journal_is_protocol_error() {
    let err = parse_unixref(
        "10.1/book",
        "<doi_records><doi_record><crossref><book/></crossref></doi_record></doi_records>",
    )
    .unwrap_err();
    assert!(err.is_remote_protocol());
}

#[tokio::test]
async fn test_locate_autolearns_bibcode_and_stores_it() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/cgi-bin/nph-abs_connect"))
        .and(query_param("bibcode", "1998ApJ...500..525S"))
        .and(query_param("data_type", "PORTABLE"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PORTABLE_RECORD))
        .expect(1)
        .mount(&server)
        .await;

    let store = empty_store().await;
    let learner = learner(&server, Config::default().with_api_key("ads", "devkey"));
    let locator = Locator::new(&store).with_learner(&learner);

    let learned = locator
        .locate_single("1998ApJ...500..525S", true)
        .await
        .unwrap();

    assert_eq!(learned.year, Some(1998));
    assert_eq!(learned.doi.as_deref(), Some("10.1086/305772"));
    assert_eq!(learned.nfas.as_deref(), Some("schlegel"));
    assert!(
        learned
            .title
            .as_deref()
            .unwrap()
            .ends_with("Radiation Foregrounds")
    );

    let authors = store.authors(learned.id, AuthorRole::Author).await.unwrap();
    assert_eq!(authors.len(), 3);
    assert_eq!(authors[0].family, "Schlegel");

    // The record is now found by any of its identifiers without the network.
    let offline = Locator::new(&store);
    assert_eq!(
        offline.locate_single("schlegel.1998", false).await.unwrap().id,
        learned.id
    );
    assert_eq!(
        offline.locate_single("10.1086/305772", false).await.unwrap().id,
        learned.id
    );
}

#[tokio::test]
async fn test_locate_autolearns_arxiv_preprint() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/api/query"))
        .and(query_param("id_list", "1706.03762"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
      You Need</title>
    <summary>The dominant sequence transduction models...</summary>
    <author><name>Ashish Vaswani</name></author>
    <author><name>Noam Shazeer</name></author>
  </entry>
</feed>"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let store = empty_store().await;
    let learner = learner(&server, Config::default());
    let locator = Locator::new(&store).with_learner(&learner);

    let learned = locator.locate_single("arxiv:1706.03762", true).await.unwrap();

    assert_eq!(learned.arxiv.as_deref(), Some("1706.03762"));
    assert_eq!(learned.year, Some(2017));
    assert_eq!(learned.nfas.as_deref(), Some("vaswani"));
    assert_eq!(
        learned.title.as_deref(),
        Some("Attention Is All You Need")
    );
}

#[tokio::test]
async fn test_failed_autolearn_stores_nothing() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/cgi-bin/nph-abs_connect"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("Retrieved 2 abstracts, selected: 2.\n"),
        )
        .mount(&server)
        .await;

    let store = empty_store().await;
    let learner = learner(&server, Config::default().with_api_key("ads", "devkey"));
    let locator = Locator::new(&store).with_learner(&learner);

    let err = locator
        .locate_single("1998ApJ...500..525S", true)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("ADS"), "got {err}");

    assert!(
        Locator::new(&store)
            .locate("1998ApJ...500..525S", true, false)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_search_ads_returns_hits() {
    let Some(server) = start_mock_server_or_skip().await else {
        return;
    };
    Mock::given(method("GET"))
        .and(path("/adsabs/api/search/"))
        .and(query_param("dev_key", "devkey"))
        .and(query_param("filter", "database:astronomy"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"results": {"docs": [
                {"bibcode": "1998ApJ...500..525S", "title": ["Maps of Dust"],
                 "author": ["Schlegel, D. J.", "Finkbeiner, D. P."]},
                {"bibcode": "1998AAS...19310001S"}
            ]}}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let learner = learner(&server, Config::default().with_api_key("ads", "devkey"));
    let hits = learner
        .search_ads(&[
            SearchTerm::Year(1998),
            SearchTerm::Surname("Schlegel".to_string()),
        ])
        .await
        .unwrap();

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].nfas.as_deref(), Some("schlegel"));
    assert_eq!(hits[1].title, "(no title)");
    assert_eq!(hits[1].nfas, None);
}

#[tokio::test]
async fn test_search_ads_requires_key() {
    let learner = Autolearner::new(Arc::new(Config::default())).unwrap();
    let err = learner
        .search_ads(&[
            SearchTerm::Year(1998),
            SearchTerm::Surname("Schlegel".to_string()),
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, LearnError::Config(_)));
}
