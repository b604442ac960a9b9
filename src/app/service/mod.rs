//! Request handling for the manifest endpoint
//!
//! [`ManifestService`] owns every piece of relay state and is shared behind
//! an `Arc` with the HTTP layer. Each request either serves the cached
//! manifest or runs a fetch cycle, according to [`FreshnessPolicy`].
//!
//! Fetch cycles are single-flight. A request that has to refresh takes
//! `fetch_lock`; if a cycle completed while it was waiting (the generation
//! counter moved), it serves that cycle's result instead of starting its own.

pub mod freshness;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub use freshness::{Clock, Decision, FreshnessPolicy, ManualClock, SystemClock};

use super::builder::ManifestBuilder;
use super::client::GitHubClient;
use super::fetcher::{FetchOutcome, FetchSource, UpstreamFetcher};
use super::models::ReleaseManifest;
use super::store::{StateStores, Stats};
use crate::config::AppConfig;
use crate::errors::{Result, UpstreamResult};

/// Shared manifest service
#[derive(Debug)]
pub struct ManifestService {
    stores: StateStores,
    fetcher: UpstreamFetcher,
    policy: FreshnessPolicy,
    clock: Arc<dyn Clock>,
    health_check_agent: String,
    fetch_lock: Mutex<()>,
    generation: AtomicU64,
}

impl ManifestService {
    pub fn new(
        stores: StateStores,
        fetcher: UpstreamFetcher,
        policy: FreshnessPolicy,
        health_check_agent: impl Into<String>,
    ) -> Self {
        Self {
            stores,
            fetcher,
            policy,
            clock: Arc::new(SystemClock),
            health_check_agent: health_check_agent.into(),
            fetch_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
        }
    }

    /// Replace the wall clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Wire up stores, client and policy from configuration
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let target = config.upstream_target();
        let state_dir = config.state_dir();
        info!("Using state directory {}", state_dir.display());

        let stores = StateStores::open(&state_dir, &target.release_repo).await?;
        let client = GitHubClient::new(target, &config.client_config())?;
        let builder = ManifestBuilder::new(config.enabled_platforms(), config.cache.notes.clone());

        Ok(Self::new(
            stores,
            UpstreamFetcher::new(client, builder),
            FreshnessPolicy::new(config.cache.min_interval),
            config.server.health_check_agent.clone(),
        ))
    }

    pub fn stores(&self) -> &StateStores {
        &self.stores
    }

    pub async fn stats(&self) -> Stats {
        self.stores.stats.current().await
    }

    /// Whether the request comes from a monitoring probe
    pub fn is_health_probe(&self, user_agent: Option<&str>) -> bool {
        !self.health_check_agent.is_empty()
            && user_agent.is_some_and(|agent| agent.contains(&self.health_check_agent))
    }

    /// Answer one manifest request
    ///
    /// Never fails: when a fetch cycle fails the cached manifest is served,
    /// or an empty manifest when nothing has been cached yet.
    pub async fn handle(&self, user_agent: Option<&str>) -> Arc<ReleaseManifest> {
        let probe = self.is_health_probe(user_agent);
        let seen_generation = self.generation.load(Ordering::Acquire);

        let cached = self.usable_cache().await;
        let last_fetch = self.stores.validators.last_fetch_time().await;
        if let (Decision::ServeCached, Some(cached)) = (
            self.policy.decide(self.clock.now(), last_fetch, cached.is_some()),
            cached,
        ) {
            debug!("Serving cached manifest {}", cached.version);
            self.count_hit(probe).await;
            return cached;
        }

        let _guard = self.fetch_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != seen_generation {
            if let Some(cached) = self.usable_cache().await {
                debug!("Fetch cycle completed while waiting; serving its result");
                self.count_hit(probe).await;
                return cached;
            }
        }

        if !probe {
            self.stores.stats.record_fetch().await;
        }
        match self.refresh_locked().await {
            Ok(manifest) => manifest,
            Err(e) => {
                let fallback = self.usable_cache().await;
                if e.is_rate_limited() {
                    warn!(
                        "{}; serving {} manifest. Consider raising cache.min_interval",
                        e,
                        if fallback.is_some() { "cached" } else { "empty" }
                    );
                } else {
                    warn!(
                        "Fetch cycle failed: {}; serving {} manifest",
                        e,
                        if fallback.is_some() { "cached" } else { "empty" }
                    );
                }
                fallback.unwrap_or_else(|| Arc::new(ReleaseManifest::default()))
            }
        }
    }

    /// Run a fetch cycle regardless of freshness
    pub async fn force_refresh(&self) -> UpstreamResult<Arc<ReleaseManifest>> {
        let _guard = self.fetch_lock.lock().await;
        self.stores.stats.record_fetch().await;
        self.refresh_locked().await
    }

    /// One fetch cycle; the caller holds `fetch_lock`
    ///
    /// On success the manifest and the staged validators are committed
    /// together and the last fetch time advances. On failure nothing is
    /// committed.
    async fn refresh_locked(&self) -> UpstreamResult<Arc<ReleaseManifest>> {
        let cached = self.usable_cache().await;
        let staged = self.stores.validators.snapshot().await;

        let result = self.fetcher.fetch_manifest(cached.as_deref(), staged).await;
        let manifest = match result {
            Ok(FetchOutcome {
                manifest,
                mut validators,
                source,
            }) => {
                let manifest = match (source, cached) {
                    (FetchSource::Rebuilt, _) | (_, None) => {
                        info!("Serving new manifest for {}", manifest.version);
                        self.stores.manifest.set(manifest).await
                    }
                    (_, Some(cached)) => {
                        info!("Upstream unchanged ({:?}); keeping {}", source, cached.version);
                        cached
                    }
                };
                validators.set_last_fetch_time(self.clock.now());
                self.stores.validators.commit(validators).await;
                Ok(manifest)
            }
            Err(e) => Err(e),
        };

        self.generation.fetch_add(1, Ordering::AcqRel);
        manifest
    }

    /// Cached manifest, unless it was built for another platform selection
    async fn usable_cache(&self) -> Option<Arc<ReleaseManifest>> {
        let cached = self.stores.manifest.get().await?;
        if self.fetcher.is_usable_cache(&cached) {
            Some(cached)
        } else {
            debug!("Cached manifest {} does not match the enabled platforms", cached.version);
            None
        }
    }

    async fn count_hit(&self, probe: bool) {
        if !probe {
            self.stores.stats.record_hit().await;
        }
    }
}
