//! Configuration validation against the manifest.
//!
//! Validation happens before merging, layer by layer, so an invalid value in
//! one layer can never poison the merged result. Every rejected id produces
//! one [`Correction`] the caller turns into exactly one warning.

use crate::model::{CategoryValue, Manifest, StructuredValue, ThemeConfig};

/// Record of one rejected option id and what replaced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    /// Category the rejected value belonged to.
    pub category: String,
    /// Sub-key inside a structured value, when the rejection was scoped.
    pub sub_key: Option<String>,
    /// The rejected option id.
    pub rejected: String,
    /// Manifest default substituted for it, when the category has one.
    pub substituted: Option<String>,
}

/// Validate one configuration layer against the manifest.
///
/// Returns the sanitized layer plus a correction per rejected id. Categories
/// the manifest does not know are dropped without a correction.
#[must_use]
pub fn validate_config(manifest: &Manifest, config: &ThemeConfig) -> (ThemeConfig, Vec<Correction>) {
    let mut validated = ThemeConfig::new();
    let mut corrections = Vec::new();

    for (category, value) in config.iter() {
        if manifest.options(category).is_none() {
            continue;
        }
        match value {
            CategoryValue::Id(id) => {
                if manifest.contains(category, id) {
                    validated.insert(category, value.clone());
                } else {
                    let substituted = manifest.default_for(category).map(ToString::to_string);
                    corrections.push(Correction {
                        category: category.to_string(),
                        sub_key: None,
                        rejected: id.clone(),
                        substituted: substituted.clone(),
                    });
                    if let Some(default) = substituted {
                        validated.insert(category, CategoryValue::Id(default));
                    }
                }
            }
            CategoryValue::Structured(structured) => {
                let sanitized =
                    validate_structured(manifest, category, structured, &mut corrections);
                if !sanitized.is_empty() {
                    validated.insert(category, CategoryValue::Structured(sanitized));
                }
            }
        }
    }

    (validated, corrections)
}

fn validate_structured(
    manifest: &Manifest,
    category: &str,
    structured: &StructuredValue,
    corrections: &mut Vec<Correction>,
) -> StructuredValue {
    let mut sanitized = StructuredValue::default();

    if let Some(preset) = &structured.preset {
        if manifest.contains(category, preset) {
            sanitized.preset = Some(preset.clone());
        } else {
            let substituted = manifest.default_for(category).map(ToString::to_string);
            corrections.push(Correction {
                category: category.to_string(),
                sub_key: Some("preset".to_string()),
                rejected: preset.clone(),
                substituted: substituted.clone(),
            });
            sanitized.preset = substituted;
        }
    }

    for (sub_key, id) in &structured.overrides {
        if manifest.contains(category, id) {
            sanitized.overrides.insert(sub_key.clone(), id.clone());
        } else {
            corrections.push(Correction {
                category: category.to_string(),
                sub_key: Some(sub_key.clone()),
                rejected: id.clone(),
                substituted: None,
            });
        }
    }

    sanitized
}

/// Base configuration selecting each category's manifest default.
#[must_use]
pub fn defaults_from(manifest: &Manifest) -> ThemeConfig {
    manifest
        .categories()
        .filter_map(|category| {
            manifest
                .default_for(category)
                .map(|id| (category.to_string(), CategoryValue::Id(id.to_string())))
        })
        .collect()
}
