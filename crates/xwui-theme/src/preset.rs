//! Preset documents and platform color-scheme mapping.
//!
//! Presets are optional JSON documents next to the manifest. A missing or
//! malformed preset is never an error: the resolver simply proceeds without
//! that layer.

use crate::manifest::DocumentFetcher;
use crate::model::ThemeConfig;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::debug;

/// Preset names probed even when no listing document exists.
pub const COMMON_PRESETS: [&str; 2] = ["light", "dark"];

/// Optional document listing additional preset names.
pub const PRESET_LISTING_FILE: &str = "presets.json";

const DEFAULT_BASE_PATH: &str = "src/styles";

/// Platform color-scheme preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorScheme {
    /// Light scheme preferred.
    Light,
    /// Dark scheme preferred.
    Dark,
}

/// Reader for the platform color-scheme preference.
pub trait ColorSchemeSource: Send + Sync {
    /// Currently preferred color scheme.
    fn preferred_scheme(&self) -> ColorScheme;
}

/// Scheme source used when no platform reader is wired in. Assumes light.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSchemeSource;

impl ColorSchemeSource for DefaultSchemeSource {
    fn preferred_scheme(&self) -> ColorScheme {
        ColorScheme::Light
    }
}

/// Loads preset documents and discovers which presets exist.
#[derive(Clone)]
pub struct PresetLoader {
    fetcher: Arc<dyn DocumentFetcher>,
    base_path: String,
    scheme_source: Arc<dyn ColorSchemeSource>,
}

impl PresetLoader {
    /// Construct a loader probing presets under the default styles path.
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>) -> Self {
        Self {
            fetcher,
            base_path: DEFAULT_BASE_PATH.to_string(),
            scheme_source: Arc::new(DefaultSchemeSource),
        }
    }

    /// Probe presets under `{base}/presets/` instead of the default path.
    #[must_use]
    pub fn with_base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = base.into();
        self
    }

    /// Use the given platform color-scheme reader.
    #[must_use]
    pub fn with_scheme_source(mut self, source: Arc<dyn ColorSchemeSource>) -> Self {
        self.scheme_source = source;
        self
    }

    fn preset_path(&self, name: &str) -> String {
        format!("{}/presets/{name}.json", self.base_path.trim_end_matches('/'))
    }

    fn listing_path(&self) -> String {
        format!(
            "{}/presets/{PRESET_LISTING_FILE}",
            self.base_path.trim_end_matches('/')
        )
    }

    /// Load a preset document by name. Missing or malformed presets yield
    /// `None` so resolution proceeds without the layer.
    pub async fn load_preset(&self, name: &str) -> Option<ThemeConfig> {
        let path = self.preset_path(name);
        let value = match self.fetcher.fetch(&path).await {
            Ok(value) => value,
            Err(err) => {
                debug!(preset = name, error = %err, "preset document unavailable");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(config) => Some(config),
            Err(err) => {
                debug!(preset = name, error = %err, "preset document malformed");
                None
            }
        }
    }

    /// Preset names that exist: the sorted, de-duplicated union of the
    /// common probes and any extras named by the listing document. The
    /// probes and the listing fetch are dispatched together and awaited as
    /// a set.
    pub async fn available_presets(&self) -> Vec<String> {
        let mut probes = JoinSet::new();
        for name in COMMON_PRESETS {
            let fetcher = Arc::clone(&self.fetcher);
            let path = self.preset_path(name);
            probes.spawn(async move {
                if fetcher.exists(&path).await {
                    vec![name.to_string()]
                } else {
                    Vec::new()
                }
            });
        }
        let fetcher = Arc::clone(&self.fetcher);
        let listing_path = self.listing_path();
        probes.spawn(async move {
            fetcher
                .fetch(&listing_path)
                .await
                .map_or_else(|_| Vec::new(), |listing| listed_names(&listing))
        });

        let mut names = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(mut found) => names.append(&mut found),
                Err(err) => debug!(error = %err, "preset probe failed"),
            }
        }
        names.sort();
        names.dedup();
        names
    }

    /// Preset name matching the platform color-scheme preference.
    ///
    /// Prefers the scheme's own preset when available, then the first
    /// available preset, then the opposite scheme's name as a last resort.
    pub async fn system_preset(&self) -> String {
        let available = self.available_presets().await;
        let (wanted, fallback) = match self.scheme_source.preferred_scheme() {
            ColorScheme::Dark => ("dark", "light"),
            ColorScheme::Light => ("light", "dark"),
        };
        if available.iter().any(|name| name == wanted) {
            return wanted.to_string();
        }
        available
            .first()
            .cloned()
            .unwrap_or_else(|| fallback.to_string())
    }
}

fn listed_names(listing: &Value) -> Vec<String> {
    let entries = match listing {
        Value::Array(entries) => entries,
        Value::Object(map) => match map.get("presets") {
            Some(Value::Array(entries)) => entries,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };
    entries
        .iter()
        .filter_map(Value::as_str)
        .map(ToString::to_string)
        .collect()
}
