//! Two-tier persisted state shared by component instances.
//!
//! Layout: `tier` defines the storage backends, `store` keeps the persisted
//! field map and performs the tiered write sequence, and `watch` surfaces
//! inbound changes with a poll fallback for contexts whose change
//! notifications never fire.
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
pub mod store;
pub mod tier;
pub mod watch;

pub use error::{StoreError, StoreResult};
pub use store::{ConfigStore, LARGE_ONLY_FIELDS};
pub use tier::{FileTier, MemoryTier, StorageTier};
pub use watch::StoreWatcher;
