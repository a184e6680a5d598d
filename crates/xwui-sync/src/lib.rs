//! Style synchronization: resolution cycles, mode switches, and inbound
//! change handling for one component instance.
//!
//! Layout: `controller` drives resolution and apply cycles, `error` carries
//! the failure taxonomy.
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

pub mod controller;
pub mod error;

pub use controller::{
    ApplyTarget, CUSTOM_BLOB_FIELD, FULL_VALIDATION_THRESHOLD, StyleController, UpdatePhase,
};
pub use error::{SyncError, SyncResult};
