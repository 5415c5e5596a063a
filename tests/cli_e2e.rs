//! End-to-end CLI tests for the `bib` binary.
//!
//! Each test points `XDG_CONFIG_HOME`/`XDG_DATA_HOME` at a temp directory so
//! nothing touches the user's real store.

use std::path::Path;

use assert_cmd::Command;
use bibtools_core::{Database, PubFields, Store};
use predicates::prelude::*;
use tempfile::TempDir;

fn bib(home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("bib").unwrap();
    cmd.env("XDG_CONFIG_HOME", home.path().join("config"))
        .env("XDG_DATA_HOME", home.path().join("data"))
        .env_remove("RUST_LOG")
        .env("COLUMNS", "100");
    cmd
}

fn db_path(home: &Path) -> std::path::PathBuf {
    home.join("data").join("bibtools").join("db.sqlite3")
}

async fn seed(home: &TempDir, pubs: Vec<PubFields>) {
    let db = Database::new(&db_path(home.path())).await.unwrap();
    let store = Store::new(db.clone());
    for fields in pubs {
        store.learn(fields).await.unwrap();
    }
    db.close().await;
}

fn smith(year: i64, doi: &str, nickname: &str) -> PubFields {
    PubFields {
        title: Some(format!("Widgets of {year}")),
        year: Some(year),
        authors: vec!["John Smith".to_string()],
        doi: Some(doi.to_string()),
        nicknames: vec![nickname.to_string()],
        ..PubFields::default()
    }
}

/// Test that --help displays usage information and exits with code 0.
#[test]
fn test_binary_help_displays_usage() {
    let home = TempDir::new().unwrap();
    bib(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Resolve short bibliographic references"));
}

/// Test that --version displays version and exits with code 0.
#[test]
fn test_binary_version_displays_version() {
    let home = TempDir::new().unwrap();
    bib(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("bib"));
}

#[test]
fn test_binary_invalid_flag_returns_error() {
    let home = TempDir::new().unwrap();
    bib(&home)
        .arg("--invalid-flag")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_list_on_empty_store_fails() {
    let home = TempDir::new().unwrap();
    bib(&home)
        .args(["list", "smith.2020"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no publications matched"));
}

#[tokio::test]
async fn test_list_shows_every_match() {
    let home = TempDir::new().unwrap();
    seed(
        &home,
        vec![smith(2019, "10.1/a", "smith19"), smith(2021, "10.1/b", "smith21")],
    )
    .await;

    bib(&home)
        .args(["list", "Smith.*"])
        .assert()
        .success()
        .stdout(predicate::str::contains("smith.2019  smith19  Widgets of 2019"))
        .stdout(predicate::str::contains("smith.2021  smith21  Widgets of 2021"));
}

#[tokio::test]
async fn test_ambiguous_reference_prints_candidates() {
    let home = TempDir::new().unwrap();
    seed(
        &home,
        vec![smith(2020, "10.1/a", "first"), smith(2020, "10.1/b", "second")],
    )
    .await;

    bib(&home)
        .args(["read", "smith.2020"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("more than one publication matched"))
        .stderr(predicate::str::contains("first"))
        .stderr(predicate::str::contains("second"));
}

#[tokio::test]
async fn test_info_prints_stored_record() {
    let home = TempDir::new().unwrap();
    seed(&home, vec![smith(2020, "10.1086/305772", "widgets")]).await;

    bib(&home)
        .args(["info", "doi:10.1086/305772"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Widgets of 2020"))
        .stdout(predicate::str::contains("authors: John Smith"))
        .stdout(predicate::str::contains("doi: 10.1086/305772"))
        .stdout(predicate::str::contains("nickname: widgets"));
}

#[tokio::test]
async fn test_read_without_pdf_fails() {
    let home = TempDir::new().unwrap();
    seed(&home, vec![smith(2020, "10.1/a", "widgets")]).await;

    bib(&home)
        .args(["read", "widgets"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no PDF stored"));
}

#[tokio::test]
async fn test_delete_removes_publication() {
    let home = TempDir::new().unwrap();
    seed(&home, vec![smith(2020, "10.1/a", "widgets")]).await;

    bib(&home)
        .args(["delete", "widgets"])
        .assert()
        .success()
        .stdout(predicate::str::contains("deleted: Widgets of 2020"));
    bib(&home)
        .args(["list", "widgets"])
        .assert()
        .failure();
}

#[test]
fn test_unknown_nickname_cannot_be_learned() {
    let home = TempDir::new().unwrap();
    bib(&home)
        .args(["info", "my-favourite-paper"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_search_rejects_two_surnames() {
    let home = TempDir::new().unwrap();
    bib(&home)
        .args(["search", "smith", "jones"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}
