//! In-memory fixtures shared by the unit tests.

use crate::error::{ThemeError, ThemeResult};
use crate::manifest::DocumentFetcher;
use crate::model::Manifest;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Fetcher serving a fixed set of documents, counting fetch attempts.
pub(crate) struct StaticFetcher {
    documents: HashMap<String, Value>,
    fetches: AtomicUsize,
}

impl StaticFetcher {
    pub(crate) fn new() -> Self {
        Self {
            documents: HashMap::new(),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(crate) fn with_document(mut self, path: &str, value: Value) -> Self {
        self.documents.insert(path.to_string(), value);
        self
    }

    pub(crate) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DocumentFetcher for StaticFetcher {
    async fn fetch(&self, path: &str) -> ThemeResult<Value> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.documents
            .get(path)
            .cloned()
            .ok_or_else(|| ThemeError::Fetch {
                path: path.to_string(),
                detail: "document not found".to_string(),
            })
    }

    async fn exists(&self, path: &str) -> bool {
        self.documents.contains_key(path)
    }
}

pub(crate) fn sample_manifest_json() -> Value {
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

pub(crate) fn sample_manifest() -> Manifest {
    serde_json::from_value(sample_manifest_json()).expect("sample manifest")
}
