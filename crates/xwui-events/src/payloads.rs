//! Signal payload types exchanged between component instances.

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

/// Identifier assigned to each signal published on the bus.
pub type SignalId = u64;

/// Default size of the broadcast channel and its backlog ring.
pub const DEFAULT_BACKLOG_CAPACITY: usize = 256;

/// Typed synchronization signals surfaced across the engine.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Signal {
    /// Immediate reload request for instances sharing a storage key. Emitted
    /// by the writer itself, since the storage-change notification never
    /// fires in the context that performed the write.
    InstanceSync {
        /// Storage key shared by the instances that should reload.
        storage_key: String,
        /// Identity of the instance that performed the write.
        origin: Uuid,
    },
    /// Persisted state under a storage key changed in some context.
    StorageUpdated {
        /// Storage key whose persisted state changed.
        storage_key: String,
        /// Milliseconds-since-epoch timestamp recorded under the updated key.
        timestamp_ms: i64,
        /// Identity of the instance that performed the write.
        origin: Uuid,
    },
    /// A resolved style changed. Carries the full result so passive
    /// listeners (e.g. a preset-switcher UI) can react without recomputing.
    StyleChanged {
        /// Active preset mode after the change.
        preset: String,
        /// Resolved configuration now in effect.
        theme: Value,
        /// Custom-override blob associated with the instance.
        custom_theme: Value,
    },
}

impl Signal {
    /// Machine-friendly discriminator for logging and filtering.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::InstanceSync { .. } => "instance_sync",
            Self::StorageUpdated { .. } => "storage_updated",
            Self::StyleChanged { .. } => "style_changed",
        }
    }

    /// Origin identity carried by the signal, when present.
    #[must_use]
    pub const fn origin(&self) -> Option<Uuid> {
        match self {
            Self::InstanceSync { origin, .. } | Self::StorageUpdated { origin, .. } => {
                Some(*origin)
            }
            Self::StyleChanged { .. } => None,
        }
    }

    /// Storage key the signal is scoped to, when present.
    #[must_use]
    pub fn storage_key(&self) -> Option<&str> {
        match self {
            Self::InstanceSync { storage_key, .. } | Self::StorageUpdated { storage_key, .. } => {
                Some(storage_key)
            }
            Self::StyleChanged { .. } => None,
        }
    }
}

/// Metadata wrapper around signals. Each envelope tracks the signal id and
/// emission timestamp.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct SignalEnvelope {
    /// Monotonic identifier assigned to the wrapped signal.
    pub id: SignalId,
    /// Timestamp recording when the envelope was produced.
    pub timestamp: DateTime<Utc>,
    /// Wrapped signal payload.
    pub signal: Signal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn signal_kind_maps_variants() {
        let origin = Uuid::nil();
        assert_eq!(
            Signal::InstanceSync {
                storage_key: "xwui-style-testers".into(),
                origin,
            }
            .kind(),
            "instance_sync"
        );
        assert_eq!(
            Signal::StorageUpdated {
                storage_key: "xwui-style-testers".into(),
                timestamp_ms: 0,
                origin,
            }
            .kind(),
            "storage_updated"
        );
        assert_eq!(
            Signal::StyleChanged {
                preset: "system".into(),
                theme: json!({}),
                custom_theme: json!({}),
            }
            .kind(),
            "style_changed"
        );
    }

    #[test]
    fn origin_and_storage_key_accessors() {
        let origin = Uuid::from_u128(7);
        let signal = Signal::StorageUpdated {
            storage_key: "k".into(),
            timestamp_ms: 42,
            origin,
        };
        assert_eq!(signal.origin(), Some(origin));
        assert_eq!(signal.storage_key(), Some("k"));

        let style = Signal::StyleChanged {
            preset: "dark".into(),
            theme: json!({"color": "dark"}),
            custom_theme: json!({}),
        };
        assert_eq!(style.origin(), None);
        assert_eq!(style.storage_key(), None);
    }
}
