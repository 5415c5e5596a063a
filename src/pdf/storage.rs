//! Content-addressed PDF library on disk.
//!
//! ```text
//! <root>/
//!   incoming.pdf            download in progress
//!   3f/3fa1...e9.pdf        one file per content hash
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use super::FetchError;

const INCOMING_FILE: &str = "incoming.pdf";

/// Paths inside the PDF library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryLayout {
    root: PathBuf,
}

impl LibraryLayout {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where downloads land before they are validated and hashed.
    #[must_use]
    pub fn incoming_path(&self) -> PathBuf {
        self.root.join(INCOMING_FILE)
    }

    /// Final location of the PDF with content hash `hash`.
    #[must_use]
    pub fn path_for(&self, hash: &str) -> PathBuf {
        let shard = hash.get(..2).unwrap_or(hash);
        self.root.join(shard).join(format!("{hash}.pdf"))
    }

    /// Makes sure the root exists so a download can start.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the directory cannot be created.
    pub async fn prepare(&self) -> Result<(), FetchError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| FetchError::io(&self.root, e))
    }

    /// Moves a validated download into its content-addressed slot.
    ///
    /// An existing file with the same hash is replaced; it has the same bytes.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Io`] if the shard directory or the rename fails.
    pub async fn file_incoming(&self, hash: &str) -> Result<PathBuf, FetchError> {
        let dest = self.path_for(hash);
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| FetchError::io(parent, e))?;
        }
        tokio::fs::rename(self.incoming_path(), &dest)
            .await
            .map_err(|e| FetchError::io(&dest, e))?;
        debug!(path = %dest.display(), "filed PDF");
        Ok(dest)
    }
}
