//! Manifest and configuration data model.
//!
//! The manifest lists, per category, the options a document ships with.
//! Configurations select one option per category, either by plain id or as
//! a structured value carrying a preset key plus per-sub-key overrides.
//! Insertion order is preserved everywhere so "first listed option" stays a
//! meaningful fallback.

use indexmap::IndexMap;
use serde_json::Value;
use std::fmt::{self, Display, Formatter};

/// Category names present even in an empty manifest.
pub const KNOWN_CATEGORIES: [&str; 11] = [
    "brand",
    "style",
    "color",
    "accent",
    "lines",
    "roundness",
    "glow",
    "font",
    "icons",
    "icons_colors",
    "emojis",
];

/// One selectable option inside a manifest category.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ThemeOption {
    /// Option identifier, matching its key in the category map.
    #[serde(default)]
    pub id: String,
    /// Human-readable option title.
    #[serde(default)]
    pub title: String,
    /// Asset folder associated with the option, when any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    /// Longer description shown in pickers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the option is the category default.
    #[serde(default, rename = "default", skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
    /// Additional metadata carried through untouched.
    #[serde(flatten)]
    pub metadata: IndexMap<String, Value>,
}

/// Catalog of available options keyed by category, then by option id.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Manifest {
    categories: IndexMap<String, IndexMap<String, ThemeOption>>,
}

impl Manifest {
    /// Manifest with every known category present but no options, used
    /// while the real manifest is still loading or failed to load.
    #[must_use]
    pub fn empty() -> Self {
        let categories = KNOWN_CATEGORIES
            .iter()
            .map(|name| ((*name).to_string(), IndexMap::new()))
            .collect();
        Self { categories }
    }

    /// Category names in listed order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Options available under a category, in listed order.
    #[must_use]
    pub fn options(&self, category: &str) -> Option<&IndexMap<String, ThemeOption>> {
        self.categories.get(category)
    }

    /// Look up a single option by category and id.
    #[must_use]
    pub fn option(&self, category: &str, id: &str) -> Option<&ThemeOption> {
        self.categories.get(category)?.get(id)
    }

    /// Whether the manifest lists the given option id under the category.
    #[must_use]
    pub fn contains(&self, category: &str, id: &str) -> bool {
        self.option(category, id).is_some()
    }

    /// Default option id for a category: the option flagged as default,
    /// otherwise the first listed option.
    #[must_use]
    pub fn default_for(&self, category: &str) -> Option<&str> {
        let options = self.categories.get(category)?;
        options
            .iter()
            .find(|(_, option)| option.is_default)
            .or_else(|| options.first())
            .map(|(id, _)| id.as_str())
    }

    /// Whether any category carries at least one option.
    #[must_use]
    pub fn has_options(&self) -> bool {
        self.categories.values().any(|options| !options.is_empty())
    }
}

/// Structured category value: an optional preset key plus sub-key overrides.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StructuredValue {
    /// Preset option id validated against the category's manifest entries.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preset: Option<String>,
    /// Per-sub-key overrides, also validated against manifest entries.
    #[serde(flatten)]
    pub overrides: IndexMap<String, String>,
}

impl StructuredValue {
    /// Whether the value carries neither a preset nor any overrides.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.preset.is_none() && self.overrides.is_empty()
    }
}

/// Value a configuration assigns to one category.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum CategoryValue {
    /// Plain option id.
    Id(String),
    /// Structured preset-plus-overrides value.
    Structured(StructuredValue),
}

impl CategoryValue {
    /// Plain id carried by the value, when it is not structured.
    #[must_use]
    pub fn as_id(&self) -> Option<&str> {
        match self {
            Self::Id(id) => Some(id),
            Self::Structured(_) => None,
        }
    }
}

/// Partial or resolved configuration mapping categories to selections.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct ThemeConfig {
    entries: IndexMap<String, CategoryValue>,
}

impl ThemeConfig {
    /// Empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the configuration selects anything at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of categories the configuration selects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Value selected for a category.
    #[must_use]
    pub fn get(&self, category: &str) -> Option<&CategoryValue> {
        self.entries.get(category)
    }

    /// Set the value for a category, replacing any previous selection.
    pub fn insert(&mut self, category: impl Into<String>, value: CategoryValue) {
        self.entries.insert(category.into(), value);
    }

    /// Remove a category's selection.
    pub fn remove(&mut self, category: &str) -> Option<CategoryValue> {
        self.entries.shift_remove(category)
    }

    /// Iterate over selections in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CategoryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Fold an overlay on top of this configuration, returning a fresh
    /// value. Structured values merge key-wise, with the overlay's preset
    /// and overrides winning; everything else is replaced outright.
    #[must_use]
    pub fn merged_with(&self, overlay: &Self) -> Self {
        let mut merged = self.clone();
        for (category, value) in &overlay.entries {
            let next = match (merged.entries.get(category), value) {
                (
                    Some(CategoryValue::Structured(base)),
                    CategoryValue::Structured(incoming),
                ) => {
                    let mut combined = base.clone();
                    if incoming.preset.is_some() {
                        combined.preset.clone_from(&incoming.preset);
                    }
                    combined
                        .overrides
                        .extend(incoming.overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
                    CategoryValue::Structured(combined)
                }
                _ => value.clone(),
            };
            merged.entries.insert(category.clone(), next);
        }
        merged
    }

    /// Serialize the configuration into a JSON value for transport.
    #[must_use]
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl<'a> IntoIterator for &'a ThemeConfig {
    type Item = (&'a String, &'a CategoryValue);
    type IntoIter = indexmap::map::Iter<'a, String, CategoryValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl FromIterator<(String, CategoryValue)> for ThemeConfig {
    fn from_iter<I: IntoIterator<Item = (String, CategoryValue)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Preset mode an instance runs in.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PresetMode {
    /// Follow the platform color-scheme preference.
    #[default]
    System,
    /// Custom mode: personalization layers and the override blob apply.
    Custom,
    /// A named preset document.
    Named(String),
}

impl PresetMode {
    /// Canonical string form of the mode.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::System => "system",
            Self::Custom => "custom",
            Self::Named(name) => name,
        }
    }

    /// Whether personalization layers are active.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom)
    }
}

impl From<&str> for PresetMode {
    fn from(value: &str) -> Self {
        match value {
            "system" => Self::System,
            "custom" => Self::Custom,
            other => Self::Named(other.to_string()),
        }
    }
}

impl From<String> for PresetMode {
    fn from(value: String) -> Self {
        Self::from(value.as_str())
    }
}

impl From<PresetMode> for String {
    fn from(mode: PresetMode) -> Self {
        mode.as_str().to_string()
    }
}

impl Display for PresetMode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config(value: serde_json::Value) -> ThemeConfig {
        serde_json::from_value(value).expect("config fixture")
    }

    #[test]
    fn manifest_default_prefers_flagged_option() {
        let manifest: Manifest = serde_json::from_value(json!({
            "color": {
                "light": {"id": "light", "title": "Light"},
                "dark": {"id": "dark", "title": "Dark", "default": true}
            },
            "lines": {
                "thin": {"id": "thin", "title": "Thin"}
            },
            "glow": {}
        }))
        .expect("manifest fixture");

        assert_eq!(manifest.default_for("color"), Some("dark"));
        assert_eq!(manifest.default_for("lines"), Some("thin"));
        assert_eq!(manifest.default_for("glow"), None);
        assert_eq!(manifest.default_for("missing"), None);
        assert!(manifest.contains("color", "light"));
        assert!(!manifest.contains("color", "neon"));
    }

    #[test]
    fn empty_manifest_lists_known_categories() {
        let manifest = Manifest::empty();
        assert_eq!(manifest.categories().count(), KNOWN_CATEGORIES.len());
        assert!(!manifest.has_options());
        assert!(manifest.options("emojis").is_some());
    }

    #[test]
    fn category_values_parse_plain_and_structured() {
        let parsed = config(json!({
            "color": "dark",
            "lines": {"preset": "thin", "width": "2"}
        }));

        assert_eq!(parsed.get("color").and_then(CategoryValue::as_id), Some("dark"));
        match parsed.get("lines") {
            Some(CategoryValue::Structured(value)) => {
                assert_eq!(value.preset.as_deref(), Some("thin"));
                assert_eq!(value.overrides.get("width").map(String::as_str), Some("2"));
            }
            other => panic!("expected structured value, got {other:?}"),
        }
    }

    #[test]
    fn merged_with_replaces_plain_and_merges_structured() {
        let base = config(json!({
            "color": "light",
            "lines": {"preset": "thin", "width": "1", "dash": "solid"}
        }));
        let overlay = config(json!({
            "color": "dark",
            "lines": {"width": "3"}
        }));

        let merged = base.merged_with(&overlay);
        assert_eq!(merged.get("color").and_then(CategoryValue::as_id), Some("dark"));
        match merged.get("lines") {
            Some(CategoryValue::Structured(value)) => {
                assert_eq!(value.preset.as_deref(), Some("thin"));
                assert_eq!(value.overrides.get("width").map(String::as_str), Some("3"));
                assert_eq!(value.overrides.get("dash").map(String::as_str), Some("solid"));
            }
            other => panic!("expected structured value, got {other:?}"),
        }

        // Inputs are untouched.
        assert_eq!(base.get("color").and_then(CategoryValue::as_id), Some("light"));
    }

    #[test]
    fn preset_mode_round_trips_through_strings() {
        assert_eq!(PresetMode::from("system"), PresetMode::System);
        assert_eq!(PresetMode::from("custom"), PresetMode::Custom);
        assert_eq!(PresetMode::from("dark"), PresetMode::Named("dark".into()));
        assert_eq!(PresetMode::Named("dark".into()).to_string(), "dark");
        assert!(PresetMode::Custom.is_custom());
        assert!(!PresetMode::System.is_custom());
    }
}
