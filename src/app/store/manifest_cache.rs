//! Latest computed manifest, in memory and on disk

use std::path::PathBuf;
use std::sync::Arc;

use moka::future::Cache;
use tracing::{debug, error, info};

use super::json_file::JsonFile;
use crate::app::models::ReleaseManifest;
use crate::constants::manifest::MEMORY_CACHE_CAPACITY;
use crate::errors::StoreResult;

/// Manifest cache keyed by release repository
///
/// The moka cache is the fast path; the JSON file is consulted on a miss
/// (cold start) and rewritten on every `set`.
#[derive(Debug)]
pub struct ManifestCache {
    key: String,
    memory: Cache<String, Arc<ReleaseManifest>>,
    file: JsonFile<ReleaseManifest>,
}

impl ManifestCache {
    /// Open the cache for `key`, creating `manifest.json` as `{}` if absent
    pub async fn open(path: impl Into<PathBuf>, key: impl Into<String>) -> StoreResult<Self> {
        let file = JsonFile::open(path).await?;
        let cache = Self {
            key: key.into(),
            memory: Cache::new(MEMORY_CACHE_CAPACITY),
            file,
        };
        if cache.get().await.is_some() {
            info!("Warm start: loaded cached manifest from {}", cache.file.path().display());
        }
        Ok(cache)
    }

    /// Current manifest, `None` when nothing has been fetched yet
    pub async fn get(&self) -> Option<Arc<ReleaseManifest>> {
        if let Some(manifest) = self.memory.get(&self.key).await {
            return Some(manifest);
        }

        let manifest = self.file.load_or_default().await;
        if !manifest.is_populated() {
            debug!("No cached manifest yet");
            return None;
        }

        let manifest = Arc::new(manifest);
        self.memory.insert(self.key.clone(), manifest.clone()).await;
        Some(manifest)
    }

    /// Replace the manifest
    ///
    /// The in-memory copy is updated even when the disk write fails.
    pub async fn set(&self, manifest: ReleaseManifest) -> Arc<ReleaseManifest> {
        if let Err(e) = self.file.save(&manifest).await {
            error!("Failed to persist manifest cache: {}", e);
        }
        let manifest = Arc::new(manifest);
        self.memory.insert(self.key.clone(), manifest.clone()).await;
        manifest
    }
}
