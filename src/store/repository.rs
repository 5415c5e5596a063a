//! Repository seam for publication persistence.
//!
//! The locator and the PDF library depend on this capability rather than on
//! the concrete `SQLite` binding.

use async_trait::async_trait;

use super::{AuthorRole, ExactField, PubFields, Publication, Result, Store, YearFilter};

/// Data-access contract consumed by the resolution and retrieval engine.
#[async_trait]
pub trait PublicationRepository: Send + Sync {
    /// Returns publications whose `field` equals `value` exactly.
    async fn query_by_exact_field(&self, field: ExactField, value: &str)
    -> Result<Vec<Publication>>;

    /// Returns publications with this NFAS, optionally restricted to one year.
    async fn query_by_nfas_and_year(&self, nfas: &str, year: YearFilter)
    -> Result<Vec<Publication>>;

    /// Inserts a new publication from a canonical field set.
    async fn insert(&self, fields: PubFields) -> Result<Publication>;

    /// Replaces the ordered name list for one role of a publication.
    async fn replace_authorship(
        &self,
        pub_id: i64,
        role: AuthorRole,
        names: &[String],
    ) -> Result<()>;

    /// Replaces all nicknames of a publication.
    async fn replace_nicknames(&self, pub_id: i64, names: &[String]) -> Result<()>;

    /// Points `hash` at `pub_id`, dropping the publication's previous hash.
    async fn upsert_pdf_association(&self, hash: &str, pub_id: i64) -> Result<()>;

    /// Deletes a publication and everything attached to it; returns the
    /// hash of its stored PDF, if any, which is now orphaned.
    async fn delete_all_for(&self, pub_id: i64) -> Result<Option<String>>;
}

#[async_trait]
impl PublicationRepository for Store {
    async fn query_by_exact_field(
        &self,
        field: ExactField,
        value: &str,
    ) -> Result<Vec<Publication>> {
        Store::query_by_exact_field(self, field, value).await
    }

    async fn query_by_nfas_and_year(
        &self,
        nfas: &str,
        year: YearFilter,
    ) -> Result<Vec<Publication>> {
        Store::query_by_nfas_and_year(self, nfas, year).await
    }

    async fn insert(&self, fields: PubFields) -> Result<Publication> {
        Store::learn(self, fields).await
    }

    async fn replace_authorship(
        &self,
        pub_id: i64,
        role: AuthorRole,
        names: &[String],
    ) -> Result<()> {
        Store::replace_authorship(self, pub_id, role, names).await
    }

    async fn replace_nicknames(&self, pub_id: i64, names: &[String]) -> Result<()> {
        Store::replace_nicknames(self, pub_id, names).await
    }

    async fn upsert_pdf_association(&self, hash: &str, pub_id: i64) -> Result<()> {
        Store::upsert_pdf_association(self, hash, pub_id).await
    }

    async fn delete_all_for(&self, pub_id: i64) -> Result<Option<String>> {
        Store::delete_all_for(self, pub_id).await
    }
}
