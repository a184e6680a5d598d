//! Layered configuration resolution.
//!
//! Precedence, lowest to highest: manifest defaults, document overrides,
//! preset document, system settings, user settings, then (custom mode only)
//! component settings, instance data, and the custom-override blob. Each
//! layer is validated before it is merged, so later layers can only
//! contribute ids the manifest actually lists.

use crate::manifest::ManifestLoader;
use crate::model::{Manifest, PresetMode, ThemeConfig, ThemeOption};
use crate::preset::PresetLoader;
use crate::validate::{Correction, defaults_from, validate_config};
use indexmap::IndexMap;
use tracing::{instrument, warn};

/// Input layers an instance contributes to resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigLayers {
    /// Overrides shipped with the hosting document.
    pub document: ThemeConfig,
    /// System-level settings.
    pub system: ThemeConfig,
    /// User-level settings.
    pub user: ThemeConfig,
    /// Component settings, applied in custom mode only.
    pub component: ThemeConfig,
    /// Per-instance data, applied in custom mode only.
    pub instance: ThemeConfig,
    /// Custom-override blob, applied in custom mode only.
    pub custom_overrides: ThemeConfig,
}

/// Outcome of one resolution pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// Fully merged configuration.
    pub config: ThemeConfig,
    /// Corrections recorded while validating the input layers.
    pub corrections: Vec<Correction>,
    /// Preset name selected for non-custom modes.
    pub preset: Option<String>,
}

/// Resolves the active configuration from manifest, preset, and layers.
#[derive(Clone)]
pub struct ThemeResolver {
    manifests: ManifestLoader,
    presets: PresetLoader,
}

impl ThemeResolver {
    /// Construct a resolver over the given loaders.
    #[must_use]
    pub fn new(manifests: ManifestLoader, presets: PresetLoader) -> Self {
        Self { manifests, presets }
    }

    /// Manifest loader backing this resolver.
    #[must_use]
    pub fn manifest_loader(&self) -> &ManifestLoader {
        &self.manifests
    }

    /// Preset loader backing this resolver.
    #[must_use]
    pub fn preset_loader(&self) -> &PresetLoader {
        &self.presets
    }

    /// Options listed for a category, for pickers.
    pub async fn options(&self, category: &str) -> Option<IndexMap<String, ThemeOption>> {
        self.manifests
            .get_manifest_async()
            .await
            .options(category)
            .cloned()
    }

    /// Single option by category and id.
    pub async fn option(&self, category: &str, id: &str) -> Option<ThemeOption> {
        self.manifests
            .get_manifest_async()
            .await
            .option(category, id)
            .cloned()
    }

    /// Default option id for a category.
    pub async fn default_option(&self, category: &str) -> Option<String> {
        self.manifests
            .get_manifest_async()
            .await
            .default_for(category)
            .map(ToString::to_string)
    }

    /// Merge all applicable layers into a fresh configuration.
    ///
    /// Always returns a new value; no input layer is mutated. One warning is
    /// emitted per rejected id across all layers.
    #[instrument(skip(self, layers), fields(mode = %mode))]
    pub async fn merge_configurations(
        &self,
        mode: &PresetMode,
        layers: &ConfigLayers,
    ) -> Resolution {
        let manifest = self.manifests.get_manifest_async().await;
        let mut corrections = Vec::new();
        let mut config = defaults_from(&manifest);

        apply_layer(&manifest, &layers.document, &mut config, &mut corrections);

        let mut preset = None;
        if !mode.is_custom() {
            let name = match mode {
                PresetMode::Named(name) => name.clone(),
                _ => self.presets.system_preset().await,
            };
            if let Some(document) = self.presets.load_preset(&name).await {
                apply_layer(&manifest, &document, &mut config, &mut corrections);
            }
            preset = Some(name);
        }

        apply_layer(&manifest, &layers.system, &mut config, &mut corrections);
        apply_layer(&manifest, &layers.user, &mut config, &mut corrections);

        if mode.is_custom() {
            apply_layer(&manifest, &layers.component, &mut config, &mut corrections);
            apply_layer(&manifest, &layers.instance, &mut config, &mut corrections);
            apply_layer(
                &manifest,
                &layers.custom_overrides,
                &mut config,
                &mut corrections,
            );
        }

        for correction in &corrections {
            warn!(
                category = %correction.category,
                sub_key = ?correction.sub_key,
                rejected = %correction.rejected,
                substituted = ?correction.substituted,
                "rejected unknown option id"
            );
        }

        Resolution {
            config,
            corrections,
            preset,
        }
    }
}

fn apply_layer(
    manifest: &Manifest,
    layer: &ThemeConfig,
    config: &mut ThemeConfig,
    corrections: &mut Vec<Correction>,
) {
    if layer.is_empty() {
        return;
    }
    let (validated, mut layer_corrections) = validate_config(manifest, layer);
    corrections.append(&mut layer_corrections);
    *config = config.merged_with(&validated);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ManifestCache;
    use crate::model::CategoryValue;
    use crate::testing::{StaticFetcher, sample_manifest_json};
    use serde_json::json;
    use std::sync::Arc;

    fn fixture_fetcher() -> StaticFetcher {
        StaticFetcher::new()
            .with_document("styles.data.json", sample_manifest_json())
            .with_document("src/styles/presets/light.json", json!({"color": "light"}))
            .with_document(
                "src/styles/presets/dark.json",
                json!({"color": "dark", "lines": "thick"}),
            )
    }

    fn resolver(fetcher: StaticFetcher) -> ThemeResolver {
        let fetcher: Arc<StaticFetcher> = Arc::new(fetcher);
        let manifests = ManifestLoader::new(fetcher.clone(), Arc::new(ManifestCache::new()));
        let presets = PresetLoader::new(fetcher);
        ThemeResolver::new(manifests, presets)
    }

    fn config(value: serde_json::Value) -> ThemeConfig {
        serde_json::from_value(value).expect("config fixture")
    }

    fn id_of(resolution: &Resolution, category: &str) -> Option<String> {
        resolution
            .config
            .get(category)
            .and_then(CategoryValue::as_id)
            .map(ToString::to_string)
    }

    #[tokio::test]
    async fn defaults_resolve_with_system_preset() {
        let resolver = resolver(fixture_fetcher());
        let resolution = resolver
            .merge_configurations(&PresetMode::System, &ConfigLayers::default())
            .await;

        assert_eq!(resolution.preset.as_deref(), Some("light"));
        assert_eq!(id_of(&resolution, "color").as_deref(), Some("light"));
        assert_eq!(id_of(&resolution, "lines").as_deref(), Some("thin"));
        assert!(resolution.corrections.is_empty());
    }

    #[tokio::test]
    async fn named_preset_layers_under_user_settings() {
        let resolver = resolver(fixture_fetcher());
        let layers = ConfigLayers {
            user: config(json!({"lines": "thin"})),
            ..ConfigLayers::default()
        };
        let resolution = resolver
            .merge_configurations(&PresetMode::Named("dark".into()), &layers)
            .await;

        assert_eq!(resolution.preset.as_deref(), Some("dark"));
        assert_eq!(id_of(&resolution, "color").as_deref(), Some("dark"));
        // User layer wins over the preset document.
        assert_eq!(id_of(&resolution, "lines").as_deref(), Some("thin"));
    }

    #[tokio::test]
    async fn personalization_layers_apply_only_in_custom_mode() {
        let layers = ConfigLayers {
            component: config(json!({"font": "mono"})),
            instance: config(json!({"roundness": "soft"})),
            custom_overrides: config(json!({"color": "dark"})),
            ..ConfigLayers::default()
        };

        let named = resolver(fixture_fetcher())
            .merge_configurations(&PresetMode::Named("light".into()), &layers)
            .await;
        assert_eq!(id_of(&named, "font").as_deref(), Some("sans"));
        assert_eq!(id_of(&named, "roundness").as_deref(), Some("sharp"));
        assert_eq!(id_of(&named, "color").as_deref(), Some("light"));

        let custom = resolver(fixture_fetcher())
            .merge_configurations(&PresetMode::Custom, &layers)
            .await;
        assert_eq!(custom.preset, None);
        assert_eq!(id_of(&custom, "font").as_deref(), Some("mono"));
        assert_eq!(id_of(&custom, "roundness").as_deref(), Some("soft"));
        assert_eq!(id_of(&custom, "color").as_deref(), Some("dark"));
    }

    #[tokio::test]
    async fn custom_overrides_beat_instance_and_component() {
        let layers = ConfigLayers {
            component: config(json!({"color": "light", "font": "sans"})),
            instance: config(json!({"color": "dark", "font": "mono"})),
            custom_overrides: config(json!({"color": "light"})),
            ..ConfigLayers::default()
        };
        let resolution = resolver(fixture_fetcher())
            .merge_configurations(&PresetMode::Custom, &layers)
            .await;

        assert_eq!(id_of(&resolution, "color").as_deref(), Some("light"));
        assert_eq!(id_of(&resolution, "font").as_deref(), Some("mono"));
    }

    #[tokio::test]
    async fn invalid_user_value_falls_back_to_default() {
        let layers = ConfigLayers {
            user: config(json!({"color": "neon"})),
            ..ConfigLayers::default()
        };
        let resolution = resolver(fixture_fetcher())
            .merge_configurations(&PresetMode::Named("dark".into()), &layers)
            .await;

        // The invalid user value resolves to the manifest default rather
        // than clobbering the preset with garbage.
        assert_eq!(id_of(&resolution, "color").as_deref(), Some("light"));
        assert_eq!(resolution.corrections.len(), 1);
        assert_eq!(resolution.corrections[0].rejected, "neon");
    }

    #[tokio::test]
    async fn option_accessors_surface_manifest_entries() {
        let resolver = resolver(fixture_fetcher());

        let options = resolver.options("color").await.expect("options");
        assert!(options.contains_key("dark"));
        let option = resolver.option("color", "dark").await.expect("option");
        assert_eq!(option.title, "Dark");
        assert_eq!(resolver.default_option("color").await.as_deref(), Some("light"));
        assert!(resolver.options("sparkles").await.is_none());
    }

    #[tokio::test]
    async fn resolution_is_idempotent() {
        let resolver = resolver(fixture_fetcher());
        let layers = ConfigLayers {
            user: config(json!({"font": "mono"})),
            ..ConfigLayers::default()
        };

        let first = resolver
            .merge_configurations(&PresetMode::Named("dark".into()), &layers)
            .await;
        let second = resolver
            .merge_configurations(&PresetMode::Named("dark".into()), &layers)
            .await;
        assert_eq!(first, second);
    }
}
