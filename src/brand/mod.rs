//! Brand-name canonicalization.
//!
//! Scraped and crowd-sourced logo images arrive with file and folder names
//! like `Nike_Jordan_Logo_2021` or `mercedes-benz-vector-black`. This module
//! maps such names onto a fixed set of brand identifiers used as class labels.

pub mod cleanup;
pub mod registry;

use serde::Serialize;
use std::sync::LazyLock;

pub use cleanup::normalize;
pub use registry::{BrandRecord, Registry, RegistryError, BUILTIN_BRANDS, REGISTRY_VERSION};

static DEFAULT_CANONICALIZER: LazyLock<Canonicalizer> =
    LazyLock::new(|| Canonicalizer::new(Registry::builtin().clone()));

/// Which stage of the pipeline produced a brand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Prefix,
    CleanedExact,
    CleanedPrefix,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrandMatch {
    pub brand: String,
    pub kind: MatchKind,
}

impl BrandMatch {
    fn new(brand: &str, kind: MatchKind) -> Self {
        Self {
            brand: brand.to_string(),
            kind,
        }
    }

    /// True when the brand came from the registry rather than the fallback.
    pub fn is_registered(&self) -> bool {
        self.kind != MatchKind::Fallback
    }
}

/// Maps raw names onto canonical brand identifiers.
///
/// Holds nothing but an immutable [`Registry`], so one instance can be shared
/// across threads.
#[derive(Debug, Clone)]
pub struct Canonicalizer {
    registry: Registry,
}

impl Canonicalizer {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Canonical identifier for `raw_name`, or `None` when nothing usable
    /// remains after cleanup.
    pub fn canonicalize(&self, raw_name: &str) -> Option<String> {
        self.resolve(raw_name).map(|found| found.brand)
    }

    /// Same as [`Canonicalizer::canonicalize`], keeping the stage that matched.
    pub fn resolve(&self, raw_name: &str) -> Option<BrandMatch> {
        let name = normalize(raw_name);

        if let Some(brand) = self.registry.lookup_exact(&name) {
            return Some(BrandMatch::new(brand, MatchKind::Exact));
        }
        if let Some(brand) = self.registry.lookup_prefix(&name) {
            return Some(BrandMatch::new(brand, MatchKind::Prefix));
        }

        let cleaned = cleanup::clean(&name);

        if let Some(brand) = self.registry.lookup_exact(&cleaned) {
            return Some(BrandMatch::new(brand, MatchKind::CleanedExact));
        }
        if let Some(brand) = self.registry.lookup_prefix(&cleaned) {
            return Some(BrandMatch::new(brand, MatchKind::CleanedPrefix));
        }

        if cleanup::is_usable_fallback(&cleaned) {
            Some(BrandMatch::new(&cleaned, MatchKind::Fallback))
        } else {
            None
        }
    }

    /// Resolves an image from its parent folder name first, then its stem.
    ///
    /// Curated datasets usually name folders after the brand already, so a
    /// registry hit on the folder wins. A folder that only yields a fallback
    /// is used when the stem itself is rejected.
    pub fn resolve_with_dir(&self, dir_name: Option<&str>, file_stem: &str) -> Option<BrandMatch> {
        let from_dir = dir_name.and_then(|dir| self.resolve(dir));
        if let Some(found) = &from_dir {
            if found.is_registered() {
                return from_dir;
            }
        }

        self.resolve(file_stem).or(from_dir)
    }
}

impl Default for Canonicalizer {
    fn default() -> Self {
        DEFAULT_CANONICALIZER.clone()
    }
}

/// Canonicalizes against the built-in registry.
pub fn canonicalize(raw_name: &str) -> Option<String> {
    DEFAULT_CANONICALIZER.canonicalize(raw_name)
}

/// Directory-first canonicalization against the built-in registry.
pub fn canonicalize_with_dir(dir_name: Option<&str>, file_stem: &str) -> Option<String> {
    DEFAULT_CANONICALIZER
        .resolve_with_dir(dir_name, file_stem)
        .map(|found| found.brand)
}
