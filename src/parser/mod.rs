//! Reference classification and author-name handling.
//!
//! Two small pieces of pure text logic sit underneath everything else:
//!
//! - [`classify_reference`] decides what kind of identifier a bare string is
//!   (DOI, bibcode, arXiv ID, nickname, or `surname.year` shorthand).
//! - [`names`] converts between the heterogeneous author-name forms used by
//!   remote services and the single stored encoding, and derives the
//!   normalized first-author surname (NFAS) used for fuzzy bucketing.
//!
//! # Example
//!
//! ```
//! use bibtools_core::parser::{RefKind, classify_reference};
//!
//! let classified = classify_reference("Smith.2020");
//! assert_eq!(classified.kind, RefKind::Nfasy);
//! assert_eq!(classified.text, "smith.2020");
//! ```

mod names;
mod reference;

pub use names::{
    PersonName, encode_name, normalize_surname, parse_name, squish_spaces, translate_ads_name,
};
pub use reference::{ClassifiedRef, RefKind, classify_reference};
