//! Manifest loading with cached, deduplicated fetches.
//!
//! The manifest lives in a well-known document (`styles.data.json`). Callers
//! that cannot wait get the best currently-available manifest immediately
//! while a background load fills the cache; async callers share one load via
//! the cache's gate so concurrent requests fetch at most once.

use crate::error::{ThemeError, ThemeResult};
use crate::model::Manifest;
use async_trait::async_trait;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Well-known manifest file name.
pub const MANIFEST_FILE: &str = "styles.data.json";

/// Candidate manifest locations, probed in listed priority order when no
/// explicit base path is configured.
pub const CANDIDATE_MANIFEST_PATHS: [&str; 4] = [
    "src/styles/styles.data.json",
    "dist/src/styles/styles.data.json",
    "styles.data.json",
    "styles/styles.data.json",
];

/// Source of JSON documents addressed by relative path.
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Fetch and parse the JSON document at the given path.
    async fn fetch(&self, path: &str) -> ThemeResult<Value>;

    /// Lightweight existence probe for the given path.
    async fn exists(&self, path: &str) -> bool;
}

/// Filesystem-backed fetcher rooted at a directory.
#[derive(Debug, Clone)]
pub struct FsFetcher {
    root: PathBuf,
}

impl FsFetcher {
    /// Construct a fetcher serving documents under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path.trim_start_matches('/'))
    }
}

#[async_trait]
impl DocumentFetcher for FsFetcher {
    async fn fetch(&self, path: &str) -> ThemeResult<Value> {
        let full = self.resolve(path);
        let raw = tokio::fs::read_to_string(&full)
            .await
            .map_err(|err| ThemeError::Fetch {
                path: path.to_string(),
                detail: err.to_string(),
            })?;
        serde_json::from_str(&raw).map_err(|err| ThemeError::Parse {
            path: path.to_string(),
            detail: err.to_string(),
        })
    }

    async fn exists(&self, path: &str) -> bool {
        tokio::fs::try_exists(self.resolve(path)).await.unwrap_or(false)
    }
}

/// Injectable cache shared by manifest loaders.
///
/// Holds the loaded manifest, the path it was found at, and the gate that
/// collapses concurrent loads into one fetch. [`ManifestCache::reset`]
/// restores the pristine state so isolated tests never observe each other.
#[derive(Debug, Default)]
pub struct ManifestCache {
    manifest: Mutex<Option<Arc<Manifest>>>,
    resolved_path: Mutex<Option<String>>,
    load_gate: tokio::sync::Mutex<()>,
    background_inflight: AtomicBool,
    warned: AtomicBool,
}

impl ManifestCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached manifest, when a load has completed.
    #[must_use]
    pub fn get(&self) -> Option<Arc<Manifest>> {
        self.lock_manifest().clone()
    }

    /// Path the manifest was last successfully fetched from.
    #[must_use]
    pub fn resolved_path(&self) -> Option<String> {
        self.resolved_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drop all cached state, forcing the next access to reload.
    pub fn reset(&self) {
        *self.lock_manifest() = None;
        *self
            .resolved_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
        self.background_inflight.store(false, Ordering::SeqCst);
        self.warned.store(false, Ordering::SeqCst);
    }

    fn store(&self, manifest: Arc<Manifest>) {
        *self.lock_manifest() = Some(manifest);
    }

    fn remember_path(&self, path: &str) {
        *self
            .resolved_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(path.to_string());
    }

    fn forget_path(&self) {
        *self
            .resolved_path
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn lock_manifest(&self) -> std::sync::MutexGuard<'_, Option<Arc<Manifest>>> {
        self.manifest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Loads the option manifest through a [`DocumentFetcher`].
#[derive(Clone)]
pub struct ManifestLoader {
    fetcher: Arc<dyn DocumentFetcher>,
    cache: Arc<ManifestCache>,
    base_path: Option<String>,
}

impl ManifestLoader {
    /// Construct a loader over the given fetcher and shared cache.
    #[must_use]
    pub fn new(fetcher: Arc<dyn DocumentFetcher>, cache: Arc<ManifestCache>) -> Self {
        Self {
            fetcher,
            cache,
            base_path: None,
        }
    }

    /// Pin manifest loading to `{base}/styles.data.json` instead of probing
    /// the candidate locations.
    #[must_use]
    pub fn with_base_path(mut self, base: impl Into<String>) -> Self {
        self.base_path = Some(base.into());
        self
    }

    /// Cache shared by this loader.
    #[must_use]
    pub fn cache(&self) -> &Arc<ManifestCache> {
        &self.cache
    }

    /// Best manifest available right now, without waiting.
    ///
    /// Returns the cached manifest when loaded, otherwise an empty manifest
    /// while a background load is kicked off onto the current Tokio runtime.
    #[must_use]
    pub fn get_manifest(&self) -> Arc<Manifest> {
        if let Some(manifest) = self.cache.get() {
            return manifest;
        }
        if !self.cache.background_inflight.swap(true, Ordering::SeqCst) {
            let loader = self.clone();
            tokio::spawn(async move {
                let _ = loader.get_manifest_async().await;
                loader.cache.background_inflight.store(false, Ordering::SeqCst);
            });
        }
        Arc::new(Manifest::empty())
    }

    /// Manifest, waiting for the load to complete.
    ///
    /// Never fails: when no candidate produces a manifest the empty manifest
    /// is cached and returned, with a single warning for the whole session.
    pub async fn get_manifest_async(&self) -> Arc<Manifest> {
        if let Some(manifest) = self.cache.get() {
            return manifest;
        }
        let _gate = self.cache.load_gate.lock().await;
        if let Some(manifest) = self.cache.get() {
            return manifest;
        }
        let manifest = match self.load().await {
            Ok(manifest) => manifest,
            Err(err) => {
                if !self.cache.warned.swap(true, Ordering::SeqCst) {
                    warn!(error = %err, "manifest unavailable, using empty manifest");
                }
                Manifest::empty()
            }
        };
        let manifest = Arc::new(manifest);
        self.cache.store(Arc::clone(&manifest));
        manifest
    }

    async fn load(&self) -> ThemeResult<Manifest> {
        if let Some(base) = &self.base_path {
            let path = format!("{}/{MANIFEST_FILE}", base.trim_end_matches('/'));
            let manifest = self.fetch_manifest_at(&path).await?;
            self.cache.remember_path(&path);
            return Ok(manifest);
        }

        if let Some(path) = self.cache.resolved_path() {
            match self.fetch_manifest_at(&path).await {
                Ok(manifest) => return Ok(manifest),
                Err(err) => {
                    debug!(%path, error = %err, "remembered manifest path went stale");
                    self.cache.forget_path();
                }
            }
        }

        // Race every candidate; adopt the first success in listed order.
        let mut set = JoinSet::new();
        for (index, path) in CANDIDATE_MANIFEST_PATHS.iter().enumerate() {
            let fetcher = Arc::clone(&self.fetcher);
            let path = (*path).to_string();
            set.spawn(async move {
                let result = fetcher.fetch(&path).await;
                (index, path, result)
            });
        }
        let mut outcomes: Vec<Option<(String, Value)>> =
            (0..CANDIDATE_MANIFEST_PATHS.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            if let Ok((index, path, Ok(value))) = joined {
                outcomes[index] = Some((path, value));
            }
        }
        for outcome in outcomes.into_iter().flatten() {
            let (path, value) = outcome;
            let manifest = parse_manifest(&path, value)?;
            self.cache.remember_path(&path);
            return Ok(manifest);
        }
        Err(ThemeError::Fetch {
            path: MANIFEST_FILE.to_string(),
            detail: "no candidate path produced a manifest".to_string(),
        })
    }

    async fn fetch_manifest_at(&self, path: &str) -> ThemeResult<Manifest> {
        let value = self.fetcher.fetch(path).await?;
        parse_manifest(path, value)
    }
}

fn parse_manifest(path: &str, value: Value) -> ThemeResult<Manifest> {
    serde_json::from_value(value).map_err(|err| ThemeError::Parse {
        path: path.to_string(),
        detail: err.to_string(),
    })
}
