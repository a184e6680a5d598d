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

//! Signal bus used to keep component instances in sync.
//!
//! Layout: `payloads.rs` (typed signals and envelopes), `routing.rs`
//! (`SignalBus` with a bounded backlog for lag recovery), `topics.rs`
//! (wire-format channel and derived storage-key names).

pub mod payloads;
pub mod routing;
pub mod topics;

pub use payloads::{Signal, SignalEnvelope, SignalId};
pub use routing::{SignalBus, SignalStream};
pub use topics::{
    STYLE_CHANGED_CHANNEL, custom_theme_key, signal_channel, sync_channel, updated_key,
};
