//! In-memory stand-ins for the document and platform seams.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use xwui_theme::preset::{ColorScheme, ColorSchemeSource};
use xwui_theme::{DocumentFetcher, ThemeError, ThemeResult};

/// Fetcher serving a fixed set of documents, counting fetch attempts.
#[derive(Default)]
pub struct StaticFetcher {
    documents: HashMap<String, Value>,
    fetches: AtomicUsize,
}

impl StaticFetcher {
    /// Fetcher with no documents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document served at the given path.
    #[must_use]
    pub fn with_document(mut self, path: &str, value: Value) -> Self {
        self.documents.insert(path.to_string(), value);
        self
    }

    /// Number of fetch attempts observed so far.
    #[must_use]
    pub fn fetches(&self) -> usize {
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

/// Scheme source returning a fixed preference.
#[derive(Debug, Clone, Copy)]
pub struct FixedSchemeSource(
    /// Preference reported to every caller.
    pub ColorScheme,
);

impl ColorSchemeSource for FixedSchemeSource {
    fn preferred_scheme(&self) -> ColorScheme {
        self.0
    }
}
