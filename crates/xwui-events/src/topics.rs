//! Wire-format channel names and derived storage keys.
//!
//! These strings are shared with the browser-facing runtime, so the exact
//! formats are load-bearing: sibling contexts watch the `-updated` key and
//! listeners subscribe to the `xwui-sync-*` / `xwui-style-changed` channels.

use crate::payloads::Signal;

/// Channel announcing resolved style changes to any interested listener.
pub const STYLE_CHANGED_CHANNEL: &str = "xwui-style-changed";

/// Same-page sync channel scoped to one storage key.
#[must_use]
pub fn sync_channel(storage_key: &str) -> String {
    format!("xwui-sync-{storage_key}")
}

/// Storage key holding the timestamp written on every update. Writing it is
/// what causes sibling contexts' change listeners to fire.
#[must_use]
pub fn updated_key(storage_key: &str) -> String {
    format!("{storage_key}-updated")
}

/// Storage key holding the custom-override blob, kept out of the small tier.
#[must_use]
pub fn custom_theme_key(storage_key: &str) -> String {
    format!("{storage_key}-customThemeConfig")
}

/// Channel name a signal is delivered on.
#[must_use]
pub fn signal_channel(signal: &Signal) -> String {
    match signal {
        Signal::InstanceSync { storage_key, .. } => sync_channel(storage_key),
        Signal::StorageUpdated { storage_key, .. } => updated_key(storage_key),
        Signal::StyleChanged { .. } => STYLE_CHANGED_CHANNEL.to_string(),
    }
}
