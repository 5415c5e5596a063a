//! PDF discovery, validated download and the content-addressed library.
//!
//! # Example
//!
//! ```no_run
//! use bibtools_core::{Config, Database, Library, ProxySession, Store};
//!
//! # async fn example(publication: bibtools_core::Publication) -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_default()?;
//! let store = Store::new(Database::new(&config.database_path()?).await?);
//! let session = ProxySession::new(config.proxy_config()?, config.timeouts())?;
//! let library = Library::new(config.library_dir()?, config.timeouts())?;
//!
//! if let Some(stored) = library.fetch_pdf(&store, &session, &publication).await? {
//!     println!("{} -> {}", stored.hash, stored.path.display());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
mod fetch;
mod scrape;
mod storage;

pub use error::FetchError;
pub use fetch::{PdfFetcher, PdfIdentifiers, PdfLinks, download_pdf};
pub use scrape::{PdfLinkScraper, scrape_pdf_link, scrape_pdf_url};
pub use storage::LibraryLayout;

use std::path::PathBuf;

use tracing::{info, instrument};

use crate::config::HttpTimeouts;
use crate::proxy::ProxySession;
use crate::store::{Publication, Store};

/// A PDF filed in the library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPdf {
    pub hash: String,
    pub path: PathBuf,
}

/// The PDF library: where files live and how new ones are fetched.
#[derive(Debug, Clone)]
pub struct Library {
    layout: LibraryLayout,
    fetcher: PdfFetcher,
}

impl Library {
    /// # Errors
    ///
    /// Returns [`FetchError::Client`] if the fetcher's HTTP client cannot be
    /// built.
    pub fn new(root: impl Into<PathBuf>, timeouts: HttpTimeouts) -> Result<Self, FetchError> {
        Ok(Self {
            layout: LibraryLayout::new(root),
            fetcher: PdfFetcher::new(timeouts)?,
        })
    }

    #[must_use]
    pub fn with_links(mut self, links: PdfLinks) -> Self {
        self.fetcher = self.fetcher.with_links(links);
        self
    }

    #[must_use]
    pub fn layout(&self) -> &LibraryLayout {
        &self.layout
    }

    /// Downloads a PDF for `publication`, files it by content hash and
    /// records the association.
    ///
    /// Returns `Ok(None)` when no PDF could be found.
    ///
    /// # Errors
    ///
    /// Propagates [`FetchError`]s from the fetch strategies, filing and the
    /// store.
    #[instrument(skip(self, store, session, publication), fields(pub_id = publication.id))]
    pub async fn fetch_pdf(
        &self,
        store: &Store,
        session: &ProxySession,
        publication: &Publication,
    ) -> Result<Option<StoredPdf>, FetchError> {
        self.layout.prepare().await?;
        let incoming = self.layout.incoming_path();
        let ids = PdfIdentifiers::from(publication);

        let Some(hash) = self.fetcher.try_fetch(session, &incoming, &ids).await? else {
            return Ok(None);
        };

        let path = self.layout.file_incoming(&hash).await?;
        store.upsert_pdf_association(&hash, publication.id).await?;
        info!(%hash, path = %path.display(), "stored PDF");
        Ok(Some(StoredPdf { hash, path }))
    }

    /// Path of the PDF associated with `pub_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Store`] if the lookup fails.
    pub async fn pdf_path(&self, store: &Store, pub_id: i64) -> Result<Option<PathBuf>, FetchError> {
        Ok(store
            .pdf_hash(pub_id)
            .await?
            .map(|hash| self.layout.path_for(&hash)))
    }
}
