//! Manifest and preset document fixtures.

use serde_json::{Value, json};

/// Install a test-friendly tracing subscriber. Safe to call repeatedly.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Manifest document with a handful of categories and flagged defaults.
#[must_use]
pub fn sample_manifest_json() -> Value {
    json!({
        "color": {
            "light": {"id": "light", "title": "Light", "default": true},
            "dark": {"id": "dark", "title": "Dark"}
        },
        "lines": {
            "thin": {"id": "thin", "title": "Thin", "default": true},
            "thick": {"id": "thick", "title": "Thick"}
        },
        "roundness": {
            "sharp": {"id": "sharp", "title": "Sharp"},
            "soft": {"id": "soft", "title": "Soft"}
        },
        "font": {
            "sans": {"id": "sans", "title": "Sans", "default": true},
            "mono": {"id": "mono", "title": "Mono"}
        }
    })
}

/// Preset document selecting the light color.
#[must_use]
pub fn light_preset_json() -> Value {
    json!({"color": "light"})
}

/// Preset document selecting the dark color and thick lines.
#[must_use]
pub fn dark_preset_json() -> Value {
    json!({"color": "dark", "lines": "thick"})
}
