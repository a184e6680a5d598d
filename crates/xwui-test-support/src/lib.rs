//! Shared fixtures and mocks for the workspace test suites.
//!
//! Layout: `fixtures` builds manifest and preset documents, `mocks` provides
//! in-memory stand-ins for the document and platform seams.
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

pub mod fixtures;
pub mod mocks;

pub use fixtures::{dark_preset_json, init_tracing, light_preset_json, sample_manifest_json};
pub use mocks::{FixedSchemeSource, StaticFetcher};
