//! Brand canonicalization and YOLO dataset preparation for logo detection.

pub mod brand;
pub mod config;
pub mod dataset;

pub use brand::{BrandMatch, Canonicalizer, MatchKind, canonicalize, canonicalize_with_dir};
pub use config::Settings;
