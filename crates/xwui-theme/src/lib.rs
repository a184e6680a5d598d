//! Manifest loading, preset resolution, and layered configuration merging.
//!
//! Layout: `model` holds the manifest and configuration types, `manifest`
//! and `preset` fetch documents through the [`DocumentFetcher`] seam,
//! `validate` rejects unknown option ids, and `resolver` folds the
//! precedence layers into one resolved configuration.
#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

pub mod error;
pub mod manifest;
pub mod model;
pub mod preset;
pub mod resolver;
#[cfg(test)]
mod testing;
pub mod validate;

pub use error::{ThemeError, ThemeResult};
pub use manifest::{DocumentFetcher, FsFetcher, MANIFEST_FILE, ManifestCache, ManifestLoader};
pub use model::{
    CategoryValue, KNOWN_CATEGORIES, Manifest, PresetMode, StructuredValue, ThemeConfig,
    ThemeOption,
};
pub use preset::{ColorScheme, ColorSchemeSource, DefaultSchemeSource, PresetLoader};
pub use resolver::{ConfigLayers, Resolution, ThemeResolver};
pub use validate::{Correction, defaults_from, validate_config};
