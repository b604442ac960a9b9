//! Freshness policy deciding between the cached manifest and a fetch cycle

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync + std::fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// What to do with an incoming request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The cached manifest is recent enough
    ServeCached,
    /// Run a fetch cycle
    Refresh,
}

/// Minimum spacing between two fetch cycles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreshnessPolicy {
    min_interval: Duration,
}

impl FreshnessPolicy {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Decide based on the last successful fetch
    ///
    /// Without a cached manifest there is nothing to serve, so the answer is
    /// always [`Decision::Refresh`]. A last fetch time in the future (clock
    /// moved backwards) counts as fresh.
    pub fn decide(
        &self,
        now: DateTime<Utc>,
        last_fetch: Option<DateTime<Utc>>,
        has_cache: bool,
    ) -> Decision {
        let Some(last_fetch) = last_fetch.filter(|_| has_cache) else {
            return Decision::Refresh;
        };
        let fresh = (now - last_fetch)
            .to_std()
            .map_or(true, |elapsed| elapsed < self.min_interval);
        if fresh {
            Decision::ServeCached
        } else {
            Decision::Refresh
        }
    }
}

impl Default for FreshnessPolicy {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_MIN_INTERVAL)
    }
}
