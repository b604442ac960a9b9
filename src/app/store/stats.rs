//! Request counters
//!
//! Counters are non-critical: they are updated in memory first and then
//! written best-effort, logging rather than failing on I/O errors.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::warn;

use super::json_file::JsonFile;
use crate::errors::StoreResult;

/// Hit and fetch counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Stats {
    /// Requests answered from cache without an upstream call
    pub cache_hits: u64,
    /// Requests that ran a fetch cycle
    pub fetches: u64,
}

impl Stats {
    /// Share of counted requests served from cache, in percent
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.fetches;
        if total == 0 {
            return 0.0;
        }
        self.cache_hits as f64 / total as f64 * 100.0
    }
}

/// Counter store mirrored to `stats.json`
#[derive(Debug)]
pub struct StatsStore {
    stats: Mutex<Stats>,
    file: JsonFile<Stats>,
}

impl StatsStore {
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let file = JsonFile::open(path).await?;
        let stats = file.load_or_default().await;
        Ok(Self {
            stats: Mutex::new(stats),
            file,
        })
    }

    pub async fn current(&self) -> Stats {
        *self.stats.lock().await
    }

    pub async fn record_hit(&self) {
        self.update(|stats| stats.cache_hits += 1).await;
    }

    pub async fn record_fetch(&self) {
        self.update(|stats| stats.fetches += 1).await;
    }

    async fn update(&self, apply: impl FnOnce(&mut Stats)) {
        let snapshot = {
            let mut stats = self.stats.lock().await;
            apply(&mut stats);
            *stats
        };
        if let Err(e) = self.file.save(&snapshot).await {
            warn!("Failed to persist stats: {}", e);
        }
    }
}
