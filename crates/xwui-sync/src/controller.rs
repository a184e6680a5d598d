//! Resolution and apply cycles for one component instance.

use crate::error::SyncResult;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, instrument, warn};
use xwui_events::{Signal, SignalBus};
use xwui_store::ConfigStore;
use xwui_theme::{
    CategoryValue, ConfigLayers, PresetMode, ThemeConfig, ThemeResolver, validate_config,
};

/// Persisted field carrying the custom-override blob.
pub const CUSTOM_BLOB_FIELD: &str = "customThemeConfig";

/// Blobs with at least this many keys skip up-front validation when custom
/// mode is entered; the next resolution pass validates them instead.
pub const FULL_VALIDATION_THRESHOLD: usize = 20;

/// Persisted field carrying the active preset mode.
const PRESET_FIELD: &str = "preset";

/// Sink a resolved configuration is applied to.
#[async_trait]
pub trait ApplyTarget: Send + Sync {
    /// Apply a resolved configuration.
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Apply`] when the configuration cannot take
    /// effect.
    async fn apply(&self, config: &ThemeConfig) -> SyncResult<()>;
}

/// Phase of the current update cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UpdatePhase {
    /// No cycle in flight.
    #[default]
    Idle,
    /// Layers are being resolved.
    Resolving,
    /// A resolved configuration is being applied.
    Applying,
}

/// Drives resolution cycles for one instance and keeps it in sync with
/// sibling instances sharing the same storage key.
///
/// Every state change runs a numbered cycle; a cycle whose number is no
/// longer current when resolution finishes is discarded, so a slow older
/// resolution can never overwrite a newer one.
pub struct StyleController {
    resolver: ThemeResolver,
    store: Arc<ConfigStore>,
    bus: SignalBus,
    apply: Arc<dyn ApplyTarget>,
    layers: ConfigLayers,
    phase: Mutex<UpdatePhase>,
    cycle: AtomicU64,
    current: Mutex<ThemeConfig>,
}

impl StyleController {
    /// Construct a controller over the given resolver, store, and target.
    ///
    /// `layers` carries the document, system, user, and component layers;
    /// the instance layer and the custom-override blob are rebuilt from the
    /// store each cycle, so persisted fields written after construction
    /// still reach resolution.
    #[must_use]
    pub fn new(
        resolver: ThemeResolver,
        store: Arc<ConfigStore>,
        bus: SignalBus,
        apply: Arc<dyn ApplyTarget>,
        layers: ConfigLayers,
    ) -> Self {
        Self {
            resolver,
            store,
            bus,
            apply,
            layers,
            phase: Mutex::new(UpdatePhase::Idle),
            cycle: AtomicU64::new(0),
            current: Mutex::new(ThemeConfig::new()),
        }
    }

    /// Store backing this controller.
    #[must_use]
    pub fn store(&self) -> &Arc<ConfigStore> {
        &self.store
    }

    /// Phase of the cycle currently in flight.
    #[must_use]
    pub fn phase(&self) -> UpdatePhase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Configuration last applied by a completed cycle.
    #[must_use]
    pub fn current_config(&self) -> ThemeConfig {
        self.lock_current().clone()
    }

    /// Active preset mode, read from persisted state.
    #[must_use]
    pub fn preset_mode(&self) -> PresetMode {
        self.store
            .field(PRESET_FIELD)
            .as_ref()
            .and_then(Value::as_str)
            .map_or_else(PresetMode::default, PresetMode::from)
    }

    /// Custom-override blob, read from persisted state.
    #[must_use]
    pub fn custom_overrides(&self) -> ThemeConfig {
        self.store
            .large_field(CUSTOM_BLOB_FIELD)
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default()
    }

    /// Personalization layer built from the persisted instance fields.
    ///
    /// The preset field is bookkeeping, not a category value, so it never
    /// enters the layer; fields that do not parse as category values are
    /// skipped.
    fn instance_layer(&self) -> ThemeConfig {
        self.store
            .snapshot()
            .into_iter()
            .filter(|(field, _)| field != PRESET_FIELD)
            .filter_map(|(field, value)| {
                serde_json::from_value::<CategoryValue>(value)
                    .ok()
                    .map(|value| (field, value))
            })
            .collect()
    }

    /// Run an initial resolution cycle against the current persisted state.
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Apply`] when the apply target rejects the
    /// resolved configuration.
    pub async fn refresh(&self) -> SyncResult<()> {
        self.run_cycle().await
    }

    /// Switch the instance to a new preset mode.
    ///
    /// Leaving custom mode snapshots the resolved configuration into the
    /// blob so re-entering custom restores it. Entering custom seeds an
    /// absent blob from the resolved configuration; a small existing blob is
    /// validated up front, a large one is applied as-is and validated by the
    /// next resolution pass.
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Apply`] when the apply target rejects the
    /// result.
    #[instrument(skip(self), fields(mode = %mode))]
    pub async fn set_preset(&self, mode: PresetMode) -> SyncResult<()> {
        let previous = self.preset_mode();

        if previous.is_custom() && !mode.is_custom() {
            let snapshot = self.current_config();
            if !snapshot.is_empty() {
                self.store
                    .set_large_field(CUSTOM_BLOB_FIELD, snapshot.to_value())
                    .await;
            }
        }

        if mode.is_custom() && !previous.is_custom() {
            let blob = self.custom_overrides();
            if blob.is_empty() {
                let seed = self.current_config();
                self.store
                    .set_large_field(CUSTOM_BLOB_FIELD, seed.to_value())
                    .await;
            } else if blob.len() < FULL_VALIDATION_THRESHOLD {
                let manifest = self
                    .resolver
                    .manifest_loader()
                    .get_manifest_async()
                    .await;
                let (sanitized, corrections) = validate_config(&manifest, &blob);
                for correction in &corrections {
                    warn!(
                        category = %correction.category,
                        rejected = %correction.rejected,
                        "rejected unknown option id in custom blob"
                    );
                }
                if !corrections.is_empty() {
                    self.store
                        .set_large_field(CUSTOM_BLOB_FIELD, sanitized.to_value())
                        .await;
                }
            } else {
                debug!(keys = blob.len(), "large custom blob applied as-is");
            }
        }

        let mut partial = Map::new();
        partial.insert(
            PRESET_FIELD.to_string(),
            Value::String(mode.as_str().to_string()),
        );
        self.store.update_data(partial).await;

        self.run_cycle().await
    }

    /// Merge a partial update into the custom-override blob.
    ///
    /// Outside custom mode this is a warned no-op: the blob only takes
    /// effect in custom mode, so accepting writes there would silently
    /// change state the user cannot see.
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Apply`] when the apply target rejects the
    /// result.
    pub async fn update_theme(&self, partial: &ThemeConfig) -> SyncResult<()> {
        let mode = self.preset_mode();
        if !mode.is_custom() {
            warn!(%mode, "ignoring custom-theme update outside custom mode");
            return Ok(());
        }

        let manifest = self.resolver.manifest_loader().get_manifest_async().await;
        let (validated, corrections) = validate_config(&manifest, partial);
        for correction in &corrections {
            warn!(
                category = %correction.category,
                rejected = %correction.rejected,
                "rejected unknown option id in custom-theme update"
            );
        }

        let blob = self.custom_overrides().merged_with(&validated);
        self.store
            .set_large_field(CUSTOM_BLOB_FIELD, blob.to_value())
            .await;

        self.run_cycle().await
    }

    /// React to an inbound change signal from a sibling instance.
    ///
    /// Signals for other storage keys, signals originated by this
    /// instance's own store, and signals arriving while a cycle is already
    /// in flight are ignored. Returns whether a resolution cycle ran.
    ///
    /// # Errors
    /// Returns [`crate::SyncError::Apply`] when the apply target rejects the
    /// result.
    pub async fn sync_from_storage(&self, signal: &Signal) -> SyncResult<bool> {
        if self.phase() != UpdatePhase::Idle {
            debug!(storage_key = %self.store.storage_key(), "dropping inbound signal mid-cycle");
            return Ok(false);
        }
        if !self.store.apply_inbound(signal).await {
            return Ok(false);
        }
        self.run_cycle().await?;
        Ok(true)
    }

    async fn run_cycle(&self) -> SyncResult<()> {
        let cycle = self.cycle.fetch_add(1, Ordering::SeqCst) + 1;
        self.set_phase(UpdatePhase::Resolving);

        let mode = self.preset_mode();
        let mut layers = self.layers.clone();
        layers.instance = self.instance_layer();
        layers.custom_overrides = self.custom_overrides();
        let resolution = self.resolver.merge_configurations(&mode, &layers).await;

        if !self.is_current(cycle) {
            debug!(cycle, "discarding stale resolution");
            return Ok(());
        }
        self.set_phase(UpdatePhase::Applying);
        if let Err(err) = self.apply.apply(&resolution.config).await {
            // A failed apply must not leave the controller wedged in
            // Applying, or every later inbound signal would be dropped.
            if self.is_current(cycle) {
                self.set_phase(UpdatePhase::Idle);
            }
            return Err(err);
        }

        if self.is_current(cycle) {
            *self.lock_current() = resolution.config.clone();
            self.set_phase(UpdatePhase::Idle);
            self.bus.publish(Signal::StyleChanged {
                preset: mode.to_string(),
                theme: resolution.config.to_value(),
                custom_theme: self.custom_overrides().to_value(),
            });
        }
        Ok(())
    }

    fn is_current(&self, cycle: u64) -> bool {
        self.cycle.load(Ordering::SeqCst) == cycle
    }

    fn set_phase(&self, phase: UpdatePhase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn lock_current(&self) -> MutexGuard<'_, ThemeConfig> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
