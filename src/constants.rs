//! Application constants for Update Relay
//!
//! This module centralizes the constants used throughout the application,
//! organized by functional domain.

use std::time::Duration;

/// HTTP client configuration constants
pub mod http {
    use super::Duration;

    /// User agent sent on every upstream request (GitHub rejects requests without one)
    pub const USER_AGENT: &str = concat!("Update-Relay/", env!("CARGO_PKG_VERSION"));

    /// Media type requested from the GitHub REST API
    pub const GITHUB_ACCEPT: &str = "application/vnd.github+json";

    /// Per-request budget for a single conditional request
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connection pool idle timeout
    pub const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);

    /// Maximum idle connections per host in pool
    pub const POOL_MAX_PER_HOST: usize = 8;
}

/// Rate limiting and retry configuration
pub mod limits {
    /// Outbound request rate towards the hosting API (requests per second)
    pub const DEFAULT_RATE_LIMIT_RPS: u32 = 5;

    /// Retry attempts for transport errors and 502/503/504
    pub const MAX_RETRIES: u32 = 2;

    /// Base delay for exponential backoff (milliseconds)
    pub const RETRY_BASE_DELAY_MS: u64 = 250;
}

/// GitHub endpoints
pub mod github {
    /// Public REST API root
    pub const API_BASE_URL: &str = "https://api.github.com";

    /// Content entry type for regular files in a directory listing
    pub const FILE_ENTRY_TYPE: &str = "file";
}

/// Manifest and freshness defaults
pub mod manifest {
    use super::Duration;

    /// Minimum time between two upstream fetch cycles
    pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(5 * 60);

    /// Release notes placed in every manifest
    pub const DEFAULT_NOTES: &str = "A new version is available. See the release page for details.";

    /// In-memory manifest cache capacity
    pub const MEMORY_CACHE_CAPACITY: u64 = 1_000;
}

/// Request handling constants
pub mod server {
    /// Default bind address
    pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";

    /// Default listening port
    pub const DEFAULT_PORT: u16 = 3000;

    /// User-Agent substring identifying synthetic monitoring probes
    pub const DEFAULT_HEALTH_CHECK_AGENT: &str = "UptimeRobot";
}

/// State file names and suffixes
pub mod files {
    /// Persisted manifest document
    pub const MANIFEST_FILE: &str = "manifest.json";

    /// Persisted hit/fetch counters
    pub const STATS_FILE: &str = "stats.json";

    /// Persisted validator tokens
    pub const VALIDATORS_FILE: &str = "validators.json";

    /// Temporary file suffix for atomic writes
    pub const TEMP_FILE_SUFFIX: &str = ".tmp";

    /// Application directory name under the platform data/config dirs
    pub const APP_DIR_NAME: &str = "update-relay";
}

/// Environment variables that override configuration values
pub mod env {
    /// Overrides `upstream.release_repo`
    pub const RELEASE_REPO: &str = "UPDATE_RELAY_RELEASE_REPO";

    /// Overrides `upstream.archive_repo`
    pub const ARCHIVE_REPO: &str = "UPDATE_RELAY_ARCHIVE_REPO";

    /// Overrides `server.port`
    pub const PORT: &str = "UPDATE_RELAY_PORT";

    /// Overrides `cache.state_dir`
    pub const STATE_DIR: &str = "UPDATE_RELAY_STATE_DIR";
}

// Re-export commonly used constants at module level for convenience
pub use http::USER_AGENT;
pub use limits::DEFAULT_RATE_LIMIT_RPS;
pub use manifest::DEFAULT_MIN_INTERVAL;
