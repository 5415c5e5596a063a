//! Integration tests for the canonical store: replace-on-update semantics,
//! nickname uniqueness and cascading deletes.

use bibtools_core::store::{AuthorRole, HistoryAction};
use bibtools_core::{Database, Locator, PubFields, Store, StoreError};

async fn store() -> Store {
    Store::new(Database::new_in_memory().await.unwrap())
}

fn record(doi: &str, authors: &[&str], nicknames: &[&str]) -> PubFields {
    PubFields {
        title: Some("A   Study\n of Things".to_string()),
        year: Some(2014),
        authors: authors.iter().map(ToString::to_string).collect(),
        doi: Some(doi.to_string()),
        nicknames: nicknames.iter().map(ToString::to_string).collect(),
        ..PubFields::default()
    }
}

#[tokio::test]
async fn test_update_leaves_exactly_the_new_authors() {
    let store = store().await;
    let original = store
        .learn(record(
            "10.1/x",
            &["Ann Zed", "Bob Young", "Cy Xu", "Di Wu"],
            &["things"],
        ))
        .await
        .unwrap();

    let updated = store
        .update(&original, record("10.1/x", &["Eve Vance", "Fay Ulm"], &[]))
        .await
        .unwrap();

    assert_eq!(updated.id, original.id);
    assert_eq!(updated.nfas.as_deref(), Some("vance"));
    let authors = store.authors(updated.id, AuthorRole::Author).await.unwrap();
    let families: Vec<&str> = authors.iter().map(|name| name.family.as_str()).collect();
    assert_eq!(families, vec!["Vance", "Ulm"]);

    // The old nickname went with the old field set.
    assert_eq!(store.choose_nickname(updated.id).await.unwrap(), None);
    assert!(
        Locator::new(&store)
            .locate("things", true, false)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_learned_record_is_found_by_surname_year() {
    let store = store().await;
    let learned = store
        .learn(record("10.1/y", &["Gabriel García_Márquez"], &[]))
        .await
        .unwrap();

    assert_eq!(learned.title.as_deref(), Some("A Study of Things"));
    assert_eq!(learned.nfas.as_deref(), Some("garcia.marquez"));

    let locator = Locator::new(&store);
    for text in ["garcia.marquez.2014", "García.Márquez.*", "Garcia.Marquez.2014"] {
        let found = locator.locate_single(text, false).await.unwrap();
        assert_eq!(found.id, learned.id, "{text}");
    }
    assert!(locator.locate("garcia.marquez.2015", true, false).await.unwrap().is_none());
}

#[tokio::test]
async fn test_duplicate_nickname_names_the_nickname() {
    let store = store().await;
    store
        .learn(record("10.1/a", &["Ann Zed"], &["dust"]))
        .await
        .unwrap();

    let err = store
        .learn(record("10.1/b", &["Bob Young"], &["dust"]))
        .await
        .unwrap_err();

    assert!(
        matches!(&err, StoreError::DuplicateNickname { nickname } if nickname == "dust"),
        "got {err:?}"
    );
    // The failed learn left nothing behind.
    assert!(
        Locator::new(&store)
            .locate("10.1/b", true, false)
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_delete_removes_every_trace() {
    let store = store().await;
    let publication = store
        .learn(record("10.1/c", &["Ann Zed"], &["gone"]))
        .await
        .unwrap();
    store.add_note(publication.id, "worth a reread").await.unwrap();
    store
        .log_action(publication.id, HistoryAction::Read)
        .await
        .unwrap();
    store
        .upsert_pdf_association(&"ab".repeat(32), publication.id)
        .await
        .unwrap();

    store.delete_all_for(publication.id).await.unwrap();

    assert!(store.get(publication.id).await.unwrap().is_none());
    assert!(store.notes(publication.id).await.unwrap().is_empty());
    assert_eq!(store.pdf_hash(publication.id).await.unwrap(), None);
    assert!(
        store
            .authors(publication.id, AuthorRole::Author)
            .await
            .unwrap()
            .is_empty()
    );

    // The identifiers are free again.
    store
        .learn(record("10.1/c", &["Ann Zed"], &["gone"]))
        .await
        .unwrap();
}
