//! Fixture import for the gallery: reads profile/post JSON from a file, a
//! directory or a URL and writes it through any [`gallery_store::Storage`].

pub mod fixture;
pub mod importer;

pub use fixture::{parse_fixtures, Document, ProfileFixture, Source};
pub use importer::{ImportOptions, ImportSummary, Importer};
