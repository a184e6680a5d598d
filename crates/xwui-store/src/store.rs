//! Persisted field map with the tiered write sequence.

use crate::error::StoreResult;
use crate::tier::StorageTier;
use chrono::Utc;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};
use uuid::Uuid;
use xwui_events::{Signal, SignalBus, updated_key};

/// Fields persisted exclusively in the large tier. They never enter the
/// small tier, whose per-entry ceiling they would blow through.
pub const LARGE_ONLY_FIELDS: [&str; 1] = ["customThemeConfig"];

fn is_large_field(field: &str) -> bool {
    LARGE_ONLY_FIELDS.contains(&field)
}

/// Persisted state for one storage key, shared by all instances using it.
///
/// Small-tier fields and large-only fields are kept in separate maps, so a
/// large-only field can never leak into the small-tier payload.
pub struct ConfigStore {
    storage_key: String,
    small: Arc<dyn StorageTier>,
    large: Arc<dyn StorageTier>,
    bus: SignalBus,
    origin: Uuid,
    state: Mutex<Map<String, Value>>,
    large_cache: Mutex<Map<String, Value>>,
    applying: AtomicBool,
    write_failure_logged: AtomicBool,
}

impl ConfigStore {
    /// Open the store and hydrate it from persisted state.
    ///
    /// The large tier is read first since it carries the bootstrap payload
    /// for contexts whose small tier was wiped; the small tier then wins for
    /// any field it still carries.
    ///
    /// # Errors
    /// Returns [`crate::StoreError::Backend`] when a tier fails to read.
    pub async fn open(
        storage_key: impl Into<String>,
        small: Arc<dyn StorageTier>,
        large: Arc<dyn StorageTier>,
        bus: SignalBus,
    ) -> StoreResult<Self> {
        let storage_key = storage_key.into();
        let mut state = Map::new();
        let mut large_cache = Map::new();

        if let Some(raw) = large.read(&storage_key).await? {
            merge_raw(&storage_key, &raw, &mut state, &mut large_cache);
        }
        if let Some(raw) = small.read(&storage_key).await? {
            merge_raw(&storage_key, &raw, &mut state, &mut large_cache);
        }
        for field in LARGE_ONLY_FIELDS {
            let key = format!("{storage_key}-{field}");
            if let Some(raw) = large.read(&key).await? {
                match serde_json::from_str(&raw) {
                    Ok(value) => {
                        large_cache.insert(field.to_string(), value);
                    }
                    Err(err) => debug!(%key, error = %err, "skipping corrupt large-tier entry"),
                }
            }
        }

        Ok(Self {
            storage_key,
            small,
            large,
            bus,
            origin: Uuid::new_v4(),
            state: Mutex::new(state),
            large_cache: Mutex::new(large_cache),
            applying: AtomicBool::new(false),
            write_failure_logged: AtomicBool::new(false),
        })
    }

    /// Storage key this store persists under.
    #[must_use]
    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }

    /// Identity stamped onto signals this store publishes.
    #[must_use]
    pub const fn origin(&self) -> Uuid {
        self.origin
    }

    /// Current value of a small-tier field.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        self.lock_state().get(name).cloned()
    }

    /// Snapshot of all small-tier fields.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.lock_state().clone()
    }

    /// Current value of a large-only field, from memory only.
    #[must_use]
    pub fn large_field(&self, name: &str) -> Option<Value> {
        self.lock_large().get(name).cloned()
    }

    /// Large-only field, reading through to the large tier and caching the
    /// result when it is not already in memory.
    pub async fn load_large_field(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.large_field(name) {
            return Some(value);
        }
        let raw = match self.large.read(&self.large_field_key(name)).await {
            Ok(raw) => raw?,
            Err(err) => {
                debug!(field = name, error = %err, "large-tier read failed");
                return None;
            }
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                self.lock_large().insert(name.to_string(), value.clone());
                Some(value)
            }
            Err(err) => {
                debug!(field = name, error = %err, "skipping corrupt large-tier entry");
                None
            }
        }
    }

    /// Merge a partial update into the persisted state.
    ///
    /// Write sequence: large-only fields go to their dedicated large-tier
    /// keys, the small payload goes to the small tier, the same payload goes
    /// to the large tier as the bootstrap copy, then the updated-timestamp
    /// key is written and the change signals are published. Tier write
    /// failures are logged once and never abort the sequence; the in-memory
    /// state stays authoritative for this instance.
    ///
    /// Returns the timestamp stamped onto the update.
    pub async fn update_data(&self, partial: Map<String, Value>) -> i64 {
        let mut large_writes = Vec::new();
        let small_payload = {
            let mut state = self.lock_state();
            let mut large_cache = self.lock_large();
            for (field, value) in partial {
                if is_large_field(&field) {
                    large_cache.insert(field.clone(), value.clone());
                    large_writes.push((field, value));
                } else {
                    state.insert(field, value);
                }
            }
            Value::Object(state.clone()).to_string()
        };

        for (field, value) in large_writes {
            self.write_guarded(self.large.as_ref(), &self.large_field_key(&field), &value.to_string())
                .await;
        }
        self.write_guarded(self.small.as_ref(), &self.storage_key, &small_payload)
            .await;
        self.write_guarded(self.large.as_ref(), &self.storage_key, &small_payload)
            .await;
        self.touch().await
    }

    /// Write a large-only field to its dedicated large-tier key.
    ///
    /// Returns the timestamp stamped onto the update.
    pub async fn set_large_field(&self, field: &str, value: Value) -> i64 {
        {
            self.lock_large().insert(field.to_string(), value.clone());
        }
        self.write_guarded(self.large.as_ref(), &self.large_field_key(field), &value.to_string())
            .await;
        self.touch().await
    }

    /// React to an inbound change signal by reloading persisted state.
    ///
    /// Signals for other storage keys, signals this store originated, and
    /// signals arriving while a reload is already in flight are ignored.
    /// Read failures are logged and leave the current state untouched.
    /// Returns whether state was reloaded.
    pub async fn apply_inbound(&self, signal: &Signal) -> bool {
        if signal.storage_key() != Some(self.storage_key.as_str()) {
            return false;
        }
        if signal.origin() == Some(self.origin) {
            return false;
        }
        if self.applying.swap(true, Ordering::SeqCst) {
            debug!(storage_key = %self.storage_key, "reload already in flight");
            return false;
        }
        let reloaded = match self.reload().await {
            Ok(()) => true,
            Err(err) => {
                warn!(storage_key = %self.storage_key, error = %err, "reload failed, keeping current state");
                false
            }
        };
        self.applying.store(false, Ordering::SeqCst);
        reloaded
    }

    async fn reload(&self) -> StoreResult<()> {
        let raw = match self.small.read(&self.storage_key).await? {
            Some(raw) => Some(raw),
            None => self.large.read(&self.storage_key).await?,
        };
        if let Some(raw) = raw {
            let parsed: Map<String, Value> = serde_json::from_str(&raw)?;
            let mut state = self.lock_state();
            state.clear();
            for (field, value) in parsed {
                if !is_large_field(&field) {
                    state.insert(field, value);
                }
            }
        }
        for field in LARGE_ONLY_FIELDS {
            if let Some(raw) = self.large.read(&self.large_field_key(field)).await? {
                let value = serde_json::from_str(&raw)?;
                self.lock_large().insert(field.to_string(), value);
            }
        }
        Ok(())
    }

    async fn touch(&self) -> i64 {
        let timestamp_ms = Utc::now().timestamp_millis();
        self.write_guarded(
            self.large.as_ref(),
            &updated_key(&self.storage_key),
            &timestamp_ms.to_string(),
        )
        .await;
        self.bus.publish(Signal::StorageUpdated {
            storage_key: self.storage_key.clone(),
            timestamp_ms,
            origin: self.origin,
        });
        self.bus.publish(Signal::InstanceSync {
            storage_key: self.storage_key.clone(),
            origin: self.origin,
        });
        timestamp_ms
    }

    async fn write_guarded(&self, tier: &dyn StorageTier, key: &str, value: &str) {
        if let Err(err) = tier.write(key, value).await {
            if self.write_failure_logged.swap(true, Ordering::SeqCst) {
                debug!(%key, error = %err, "tier write failed");
            } else {
                warn!(%key, error = %err, "tier write failed, memory remains authoritative");
            }
        }
    }

    fn large_field_key(&self, field: &str) -> String {
        format!("{}-{field}", self.storage_key)
    }

    fn lock_state(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_large(&self) -> MutexGuard<'_, Map<String, Value>> {
        self.large_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn merge_raw(
    storage_key: &str,
    raw: &str,
    state: &mut Map<String, Value>,
    large_cache: &mut Map<String, Value>,
) {
    match serde_json::from_str::<Map<String, Value>>(raw) {
        Ok(parsed) => {
            for (field, value) in parsed {
                if is_large_field(&field) {
                    large_cache.insert(field, value);
                } else {
                    state.insert(field, value);
                }
            }
        }
        Err(err) => debug!(%storage_key, error = %err, "skipping corrupt persisted payload"),
    }
}
