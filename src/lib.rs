//! Bibtools Core Library
//!
//! This library resolves short, ambiguous bibliographic references (DOIs,
//! ADS bibcodes, arXiv identifiers, nicknames, `surname.year` shorthands) to
//! canonical publication records, learning unknown records from remote
//! metadata services and fetching their PDFs through an institutional proxy.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`parser`] - Reference classification and author-name normalization
//! - [`store`] - Canonical publication records on top of [`db`]
//! - [`locate`] - Local lookup and disambiguation of references
//! - [`learn`] - Autolearning ingesters for ADS, Crossref and arXiv
//! - [`proxy`] - Cookie-backed session with institutional proxy login
//! - [`pdf`] - PDF link discovery, validated download, content-addressed library
//! - [`config`] - User configuration (API keys, proxy credentials, paths)

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod db;
pub mod html;
pub mod http_client;
pub mod learn;
pub mod locate;
pub mod parser;
pub mod pdf;
pub mod proxy;
pub mod store;
mod user_agent;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use config::{Config, ConfigError};
pub use db::Database;
pub use learn::{Autolearner, LearnError, MetadataSource};
pub use locate::{LocateError, Locator, print_generic_listing};
pub use parser::{ClassifiedRef, PersonName, RefKind, classify_reference, normalize_surname};
pub use pdf::{FetchError, Library, PdfIdentifiers};
pub use proxy::{ProxyConfig, ProxyError, ProxySession};
pub use store::{PubFields, Publication, PublicationRepository, Store, StoreError};
