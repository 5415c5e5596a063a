//! Canonical publication store.
//!
//! [`Store`] owns every persisted entity: publications, the deduplicated
//! author-name table, ordered authorship rows, nicknames, PDF hash
//! associations, the history log, and notes. Callers work on value copies
//! ([`Publication`]) and write back full replacements.
//!
//! `learn` and `update` converge on one write path, run inside a single
//! transaction:
//!
//! - title and abstract whitespace is squished
//! - `nfas` is recomputed from the first author
//! - refdata is linted and serialized to JSON
//! - authorship and nickname rows are (re)created from the field set
//!
//! A failure anywhere rolls the whole write back, so a record is never left
//! with orphaned or half-replaced associations.

mod error;
mod record;
mod repository;

pub use error::{StoreDbErrorKind, StoreError};
pub use record::{AuthorRole, ExactField, HistoryAction, PubFields, Publication, YearFilter};
pub use repository::PublicationRepository;

use std::collections::BTreeMap;

use sqlx::SqliteConnection;
use tracing::{debug, instrument, warn};

use crate::db::Database;
use crate::parser::{PersonName, normalize_surname, parse_name, squish_spaces};

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Journal value some records carry for preprints; useless for citation.
const PLACEHOLDER_JOURNAL: &str = "ArXiv e-prints";

/// Child tables cleared before the `pubs` row itself.
const DELETE_CHILD_ROWS: [&str; 5] = [
    "DELETE FROM authors WHERE pubid = ?",
    "DELETE FROM history WHERE pubid = ?",
    "DELETE FROM nicknames WHERE pubid = ?",
    "DELETE FROM notes WHERE pubid = ?",
    "DELETE FROM pdfs WHERE pubid = ?",
];

/// SQLite-backed publication store.
#[derive(Debug, Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Creates a store over an open database.
    #[must_use]
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Returns the underlying database.
    #[must_use]
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Returns publications whose `field` equals `value` (byte-exact).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self), fields(field = %field))]
    pub async fn query_by_exact_field(
        &self,
        field: ExactField,
        value: &str,
    ) -> Result<Vec<Publication>> {
        let sql = match field {
            ExactField::Doi => "SELECT * FROM pubs WHERE doi = ? ORDER BY id",
            ExactField::Bibcode => "SELECT * FROM pubs WHERE bibcode = ? ORDER BY id",
            ExactField::Arxiv => "SELECT * FROM pubs WHERE arxiv = ? ORDER BY id",
            ExactField::Nickname => {
                "SELECT p.* FROM pubs AS p JOIN nicknames AS n ON n.pubid = p.id \
                 WHERE n.nickname = ? ORDER BY p.id"
            }
        };
        let rows = sqlx::query_as::<_, Publication>(sql)
            .bind(value)
            .fetch_all(self.db.pool())
            .await?;
        debug!(matches = rows.len(), "exact-field lookup");
        Ok(rows)
    }

    /// Returns publications in an NFAS bucket, optionally for one year.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    #[instrument(skip(self))]
    pub async fn query_by_nfas_and_year(
        &self,
        nfas: &str,
        year: YearFilter,
    ) -> Result<Vec<Publication>> {
        let rows = match year {
            YearFilter::Any => {
                sqlx::query_as::<_, Publication>("SELECT * FROM pubs WHERE nfas = ? ORDER BY id")
                    .bind(nfas)
                    .fetch_all(self.db.pool())
                    .await?
            }
            YearFilter::Exact(year) => {
                sqlx::query_as::<_, Publication>(
                    "SELECT * FROM pubs WHERE nfas = ? AND year = ? ORDER BY id",
                )
                .bind(nfas)
                .bind(year)
                .fetch_all(self.db.pool())
                .await?
            }
        };
        debug!(matches = rows.len(), "surname/year lookup");
        Ok(rows)
    }

    /// Inserts a new publication.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateNickname`] if a nickname is taken, or
    /// [`StoreError::Database`] (constraint violation) if an identifier
    /// already belongs to another record. Nothing is written on error.
    #[instrument(skip(self, fields), fields(doi = ?fields.doi, bibcode = ?fields.bibcode, arxiv = ?fields.arxiv))]
    pub async fn learn(&self, fields: PubFields) -> Result<Publication> {
        let mut tx = self.db.pool().begin().await?;
        let publication = write_publication(&mut tx, None, fields).await?;
        tx.commit().await?;
        debug!(id = publication.id, "learned publication");
        Ok(publication)
    }

    /// Replaces an existing publication with a new field set.
    ///
    /// All prior authorship and nickname rows are dropped and rebuilt from
    /// `fields`; nothing is merged field by field. The existing `keep` flag
    /// is preserved.
    ///
    /// # Errors
    ///
    /// As for [`Store::learn`], plus [`StoreError::PublicationNotFound`].
    #[instrument(skip(self, existing, fields), fields(id = existing.id))]
    pub async fn update(&self, existing: &Publication, mut fields: PubFields) -> Result<Publication> {
        fields.keep = existing.is_kept();

        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM authors WHERE pubid = ?")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM nicknames WHERE pubid = ?")
            .bind(existing.id)
            .execute(&mut *tx)
            .await?;
        let publication = write_publication(&mut tx, Some(existing.id), fields).await?;
        tx.commit().await?;
        debug!("updated publication");
        Ok(publication)
    }

    /// Replaces the ordered names for one role; positions become `0..n`.
    ///
    /// Replacing the author list also recomputes `nfas`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PublicationNotFound`] or [`StoreError::Database`].
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn replace_authorship(
        &self,
        pub_id: i64,
        role: AuthorRole,
        names: &[String],
    ) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        ensure_exists(&mut tx, pub_id).await?;
        sqlx::query("DELETE FROM authors WHERE pubid = ? AND type = ?")
            .bind(pub_id)
            .bind(role.as_db())
            .execute(&mut *tx)
            .await?;
        insert_authorship(&mut tx, pub_id, role, names).await?;
        if role == AuthorRole::Author {
            sqlx::query("UPDATE pubs SET nfas = ? WHERE id = ?")
                .bind(first_author_nfas(names))
                .bind(pub_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    /// Replaces all nicknames of a publication.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateNickname`] if any nickname belongs to
    /// another publication; nothing is changed in that case.
    #[instrument(skip(self, names), fields(count = names.len()))]
    pub async fn replace_nicknames(&self, pub_id: i64, names: &[String]) -> Result<()> {
        let mut tx = self.db.pool().begin().await?;
        ensure_exists(&mut tx, pub_id).await?;
        sqlx::query("DELETE FROM nicknames WHERE pubid = ?")
            .bind(pub_id)
            .execute(&mut *tx)
            .await?;
        insert_nicknames(&mut tx, pub_id, names).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Records that `hash` is the PDF of `pub_id`.
    ///
    /// A publication keeps only its most recent hash, and a hash maps to one
    /// publication; either previous row is replaced.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    #[instrument(skip(self))]
    pub async fn upsert_pdf_association(&self, hash: &str, pub_id: i64) -> Result<()> {
        sqlx::query("INSERT OR REPLACE INTO pdfs (hash, pubid) VALUES (?, ?)")
            .bind(hash)
            .bind(pub_id)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Deletes a publication with its authorship, history, nickname, note
    /// and PDF rows.
    ///
    /// Returns the hash of the publication's PDF, whose library file is
    /// left behind.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PublicationNotFound`] or [`StoreError::Database`].
    #[instrument(skip(self))]
    pub async fn delete_all_for(&self, pub_id: i64) -> Result<Option<String>> {
        let mut tx = self.db.pool().begin().await?;
        let hash: Option<String> = sqlx::query_scalar("SELECT hash FROM pdfs WHERE pubid = ?")
            .bind(pub_id)
            .fetch_optional(&mut *tx)
            .await?;

        for sql in DELETE_CHILD_ROWS {
            sqlx::query(sql).bind(pub_id).execute(&mut *tx).await?;
        }
        let deleted = sqlx::query("DELETE FROM pubs WHERE id = ?")
            .bind(pub_id)
            .execute(&mut *tx)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(StoreError::PublicationNotFound(pub_id));
        }
        tx.commit().await?;

        if let Some(hash) = &hash {
            warn!(pub_id, hash = %hash, "orphaning stored PDF file");
        }
        Ok(hash)
    }

    /// Appends a history entry stamped with the current time.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    #[instrument(skip(self))]
    pub async fn log_action(&self, pub_id: i64, action: HistoryAction) -> Result<()> {
        sqlx::query("INSERT INTO history (date, pubid, action) VALUES (?, ?, ?)")
            .bind(chrono::Utc::now().timestamp())
            .bind(pub_id)
            .bind(action.as_db())
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Attaches a free-text note to a publication.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the write fails.
    pub async fn add_note(&self, pub_id: i64, text: &str) -> Result<()> {
        sqlx::query("INSERT INTO notes (pubid, text) VALUES (?, ?)")
            .bind(pub_id)
            .bind(text)
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    /// Returns the notes of a publication in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn notes(&self, pub_id: i64) -> Result<Vec<String>> {
        Ok(
            sqlx::query_scalar("SELECT text FROM notes WHERE pubid = ? ORDER BY rowid")
                .bind(pub_id)
                .fetch_all(self.db.pool())
                .await?,
        )
    }

    /// Fetches one publication by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn get(&self, pub_id: i64) -> Result<Option<Publication>> {
        Ok(
            sqlx::query_as::<_, Publication>("SELECT * FROM pubs WHERE id = ?")
                .bind(pub_id)
                .fetch_optional(self.db.pool())
                .await?,
        )
    }

    /// Returns the names for one role in citation order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn authors(&self, pub_id: i64, role: AuthorRole) -> Result<Vec<PersonName>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT an.name FROM authors AS au JOIN author_names AS an ON au.authid = an.id \
             WHERE au.type = ? AND au.pubid = ? ORDER BY au.idx",
        )
        .bind(role.as_db())
        .bind(pub_id)
        .fetch_all(self.db.pool())
        .await?;
        Ok(names.iter().map(|name| parse_name(name)).collect())
    }

    /// Returns the first author's surname as stored, not normalized.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn first_author_surname(&self, pub_id: i64) -> Result<Option<String>> {
        let name: Option<String> = sqlx::query_scalar(
            "SELECT an.name FROM authors AS au JOIN author_names AS an ON au.authid = an.id \
             WHERE au.type = ? AND au.pubid = ? AND au.idx = 0",
        )
        .bind(AuthorRole::Author.as_db())
        .bind(pub_id)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(name.map(|name| parse_name(&name).family))
    }

    /// Picks the shortest nickname of a publication, if it has any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn choose_nickname(&self, pub_id: i64) -> Result<Option<String>> {
        Ok(sqlx::query_scalar(
            "SELECT nickname FROM nicknames WHERE pubid = ? \
             ORDER BY length(nickname) ASC, nickname ASC LIMIT 1",
        )
        .bind(pub_id)
        .fetch_optional(self.db.pool())
        .await?)
    }

    /// Returns the hash of a publication's stored PDF.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Database`] if the query fails.
    pub async fn pdf_hash(&self, pub_id: i64) -> Result<Option<String>> {
        Ok(sqlx::query_scalar("SELECT hash FROM pdfs WHERE pubid = ?")
            .bind(pub_id)
            .fetch_optional(self.db.pool())
            .await?)
    }
}

async fn write_publication(
    conn: &mut SqliteConnection,
    existing_id: Option<i64>,
    fields: PubFields,
) -> Result<Publication> {
    let PubFields {
        title,
        year,
        abstract_text,
        authors,
        editors,
        doi,
        bibcode,
        arxiv,
        nicknames,
        refdata,
        keep,
    } = fields;

    let title = title.as_deref().map(squish_spaces);
    let abstract_text = abstract_text.as_deref().map(squish_spaces);
    let nfas = first_author_nfas(&authors);
    let refdata = refdata.as_ref().map(encode_refdata).transpose()?;
    let keep = i64::from(keep);

    let pub_id = if let Some(id) = existing_id {
        let result = sqlx::query(
            "UPDATE pubs SET abstract = ?, arxiv = ?, bibcode = ?, doi = ?, keep = ?, \
             nfas = ?, refdata = ?, title = ?, year = ? WHERE id = ?",
        )
        .bind(abstract_text.as_deref())
        .bind(arxiv.as_deref())
        .bind(bibcode.as_deref())
        .bind(doi.as_deref())
        .bind(keep)
        .bind(nfas.as_deref())
        .bind(refdata.as_deref())
        .bind(title.as_deref())
        .bind(year)
        .bind(id)
        .execute(&mut *conn)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::PublicationNotFound(id));
        }
        id
    } else {
        sqlx::query_scalar(
            "INSERT INTO pubs (abstract, arxiv, bibcode, doi, keep, nfas, refdata, title, year) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(abstract_text.as_deref())
        .bind(arxiv.as_deref())
        .bind(bibcode.as_deref())
        .bind(doi.as_deref())
        .bind(keep)
        .bind(nfas.as_deref())
        .bind(refdata.as_deref())
        .bind(title.as_deref())
        .bind(year)
        .fetch_one(&mut *conn)
        .await?
    };

    insert_authorship(conn, pub_id, AuthorRole::Author, &authors).await?;
    insert_authorship(conn, pub_id, AuthorRole::Editor, &editors).await?;
    insert_nicknames(conn, pub_id, &nicknames).await?;

    sqlx::query_as::<_, Publication>("SELECT * FROM pubs WHERE id = ?")
        .bind(pub_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(StoreError::PublicationNotFound(pub_id))
}

/// Writes authorship rows, deduplicating names against `author_names`.
async fn insert_authorship(
    conn: &mut SqliteConnection,
    pub_id: i64,
    role: AuthorRole,
    names: &[String],
) -> Result<()> {
    for (position, name) in (0_i64..).zip(names) {
        sqlx::query("INSERT OR IGNORE INTO author_names (name) VALUES (?)")
            .bind(name)
            .execute(&mut *conn)
            .await?;
        let author_id: i64 = sqlx::query_scalar("SELECT id FROM author_names WHERE name = ?")
            .bind(name)
            .fetch_one(&mut *conn)
            .await?;
        sqlx::query("INSERT INTO authors (type, pubid, idx, authid) VALUES (?, ?, ?, ?)")
            .bind(role.as_db())
            .bind(pub_id)
            .bind(position)
            .bind(author_id)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

async fn insert_nicknames(
    conn: &mut SqliteConnection,
    pub_id: i64,
    nicknames: &[String],
) -> Result<()> {
    for nickname in nicknames {
        let result = sqlx::query("INSERT INTO nicknames (nickname, pubid) VALUES (?, ?)")
            .bind(nickname)
            .bind(pub_id)
            .execute(&mut *conn)
            .await;
        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_error)) if db_error.is_unique_violation() => {
                return Err(StoreError::duplicate_nickname(nickname));
            }
            Err(other) => return Err(other.into()),
        }
    }
    Ok(())
}

async fn ensure_exists(conn: &mut SqliteConnection, pub_id: i64) -> Result<()> {
    let found: Option<i64> = sqlx::query_scalar("SELECT id FROM pubs WHERE id = ?")
        .bind(pub_id)
        .fetch_optional(&mut *conn)
        .await?;
    found
        .map(|_| ())
        .ok_or(StoreError::PublicationNotFound(pub_id))
}

fn first_author_nfas(authors: &[String]) -> Option<String> {
    authors
        .first()
        .map(|first| normalize_surname(&parse_name(first).family))
}

fn encode_refdata(refdata: &BTreeMap<String, String>) -> Result<String> {
    if refdata.get("journal").map(String::as_str) == Some(PLACEHOLDER_JOURNAL) {
        warn!("useless \"{PLACEHOLDER_JOURNAL}\" bibliographical record");
    }
    serde_json::to_string(refdata).map_err(|e| StoreError::Refdata(e.to_string()))
}
