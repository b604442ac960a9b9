//! Prelude module for Update Relay
//!
//! Re-exports the items needed to embed the relay in another binary with a
//! single `use update_relay::prelude::*;` statement.
//!
//! # Usage
//!
//! ```rust,no_run
//! use update_relay::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = AppConfig::load(None).await?;
//!     let service = Arc::new(ManifestService::from_config(&config).await?);
//!     let manifest = service.handle(None).await;
//!     println!("latest version: {}", manifest.version);
//!     Ok(())
//! }
//! ```

// Core result types
pub use crate::errors::{AppError, Result};

pub use crate::app::{
    classify, ClientConfig, FreshnessPolicy, GitHubClient, ManifestBuilder, ManifestService,
    Platform, PlatformAsset, PlatformSet, ReleaseManifest, StateStores, UpstreamFetcher,
    UpstreamTarget,
};
pub use crate::config::AppConfig;
pub use crate::server::{build_router, AppState};

// Commonly used constants
pub use crate::constants::{DEFAULT_MIN_INTERVAL, DEFAULT_RATE_LIMIT_RPS, USER_AGENT};

pub use std::path::{Path, PathBuf};
pub use std::sync::Arc;

pub use tokio;
