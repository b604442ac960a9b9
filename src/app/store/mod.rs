//! Durable relay state
//!
//! Three independent JSON documents live in the state directory:
//!
//! - [`manifest_cache`] - the latest computed manifest (`manifest.json`)
//! - [`validators`] - conditional-request tokens (`validators.json`)
//! - [`stats`] - hit/fetch counters (`stats.json`)
//!
//! Each is created as `{}` when missing and written through
//! [`json_file::JsonFile`], which serializes writers per file and replaces
//! documents atomically.

pub mod json_file;
pub mod manifest_cache;
pub mod stats;
pub mod validators;

use std::path::Path;

pub use json_file::JsonFile;
pub use manifest_cache::ManifestCache;
pub use stats::{Stats, StatsStore};
pub use validators::{ValidatorState, ValidatorStore};

use crate::constants::files;
use crate::errors::StoreResult;

/// All state stores rooted in one directory
#[derive(Debug)]
pub struct StateStores {
    pub manifest: ManifestCache,
    pub validators: ValidatorStore,
    pub stats: StatsStore,
}

impl StateStores {
    /// Open (and create if needed) every state file under `state_dir`
    pub async fn open(state_dir: &Path, cache_key: &str) -> StoreResult<Self> {
        json_file::ensure_directory_exists(state_dir).await?;
        Ok(Self {
            manifest: ManifestCache::open(state_dir.join(files::MANIFEST_FILE), cache_key).await?,
            validators: ValidatorStore::open(state_dir.join(files::VALIDATORS_FILE)).await?,
            stats: StatsStore::open(state_dir.join(files::STATS_FILE)).await?,
        })
    }
}
