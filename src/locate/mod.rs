//! Resolving references against the local store.
//!
//! A reference is classified, looked up with the query that fits its kind
//! and, when nothing matches, optionally autolearned from a
//! [`MetadataSource`] and inserted.

mod error;
mod listing;

pub use error::LocateError;
pub use listing::{format_generic_listing, print_generic_listing};

use tracing::{debug, info, instrument};

use crate::learn::MetadataSource;
use crate::parser::{ClassifiedRef, RefKind, classify_reference};
use crate::store::{ExactField, Publication, PublicationRepository, YearFilter};

/// Looks references up in a [`PublicationRepository`].
pub struct Locator<'a> {
    repo: &'a dyn PublicationRepository,
    learner: Option<&'a dyn MetadataSource>,
}

impl std::fmt::Debug for Locator<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("autolearn", &self.learner.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> Locator<'a> {
    /// A locator that can only find what is already stored.
    #[must_use]
    pub fn new(repo: &'a dyn PublicationRepository) -> Self {
        Self {
            repo,
            learner: None,
        }
    }

    /// Enables autolearning through `learner`.
    #[must_use]
    pub fn with_learner(mut self, learner: &'a dyn MetadataSource) -> Self {
        self.learner = Some(learner);
        self
    }

    /// Returns every stored publication matching `text`.
    ///
    /// # Errors
    ///
    /// Returns [`LocateError::InvalidYear`] or a store error.
    #[instrument(skip(self))]
    pub async fn locate_all(&self, text: &str) -> Result<Vec<Publication>, LocateError> {
        let reference = classify_reference(text);
        self.query(&reference).await
    }

    /// Resolves `text` to at most one publication.
    ///
    /// With no local match the reference is autolearned when
    /// `allow_autolearn` is set and a learner is attached; otherwise
    /// `Ok(None)` is returned when `allow_zero` is set.
    ///
    /// # Errors
    ///
    /// - [`LocateError::Ambiguous`] when more than one publication matches,
    ///   whatever the flags.
    /// - [`LocateError::NotFound`] when nothing matches and neither flag
    ///   rescues it.
    /// - Autolearning and store failures.
    #[instrument(skip(self))]
    pub async fn locate(
        &self,
        text: &str,
        allow_zero: bool,
        allow_autolearn: bool,
    ) -> Result<Option<Publication>, LocateError> {
        let reference = classify_reference(text);
        let mut matches = self.query(&reference).await?;

        match matches.len() {
            0 => {}
            1 => return Ok(matches.pop()),
            n => {
                debug!(text, matches = n, "ambiguous reference");
                return Err(LocateError::Ambiguous {
                    text: text.to_string(),
                    candidates: matches,
                });
            }
        }

        if allow_autolearn && let Some(learner) = self.learner {
            let fields = learner.autolearn(&reference).await?;
            let publication = self.repo.insert(fields).await?;
            info!(text, id = publication.id, "learned new publication");
            return Ok(Some(publication));
        }

        if allow_zero {
            Ok(None)
        } else {
            Err(LocateError::NotFound {
                text: text.to_string(),
            })
        }
    }

    /// Resolves `text` to exactly one publication.
    ///
    /// # Errors
    ///
    /// As for [`Locator::locate`]; a miss is always [`LocateError::NotFound`].
    pub async fn locate_single(
        &self,
        text: &str,
        allow_autolearn: bool,
    ) -> Result<Publication, LocateError> {
        self.locate(text, false, allow_autolearn)
            .await?
            .ok_or_else(|| LocateError::NotFound {
                text: text.to_string(),
            })
    }

    async fn query(&self, reference: &ClassifiedRef) -> Result<Vec<Publication>, LocateError> {
        let field = match reference.kind {
            RefKind::Doi => ExactField::Doi,
            RefKind::Bibcode => ExactField::Bibcode,
            RefKind::Arxiv => ExactField::Arxiv,
            RefKind::Nickname => ExactField::Nickname,
            RefKind::Nfasy => {
                let (nfas, year) = reference.nfas_and_year().ok_or_else(|| {
                    LocateError::InvalidYear {
                        text: reference.text.clone(),
                    }
                })?;
                let year = YearFilter::parse(year).ok_or_else(|| LocateError::InvalidYear {
                    text: reference.text.clone(),
                })?;
                return Ok(self.repo.query_by_nfas_and_year(nfas, year).await?);
            }
        };
        Ok(self
            .repo
            .query_by_exact_field(field, &reference.text)
            .await?)
    }
}
