//! Core application logic for Update Relay
//!
//! - [`platform`] maps artifact file names to target platforms
//! - [`client`] performs conditional requests against the GitHub API
//! - [`fetcher`] runs the three-stage fetch cycle
//! - [`builder`] turns a release listing into a manifest
//! - [`store`] persists the manifest, validator tokens and counters
//! - [`service`] decides per request between cache and fetch
//!
//! # Examples
//!
//! ```rust
//! use update_relay::app::{classify, Platform};
//!
//! assert_eq!(classify("App-1.2.3-arm64.msi"), Some(Platform::WindowsAarch64));
//! assert_eq!(classify("readme.txt"), None);
//! ```

pub mod builder;
pub mod client;
pub mod fetcher;
pub mod models;
pub mod platform;
pub mod service;
pub mod store;

// Re-export main public API
pub use builder::{ManifestBuilder, PlatformFiles};
pub use client::{ClientConfig, Conditional, GitHubClient, UpstreamTarget};
pub use fetcher::{FetchOutcome, FetchSource, UpstreamFetcher};
pub use models::{PlatformAsset, ReleaseFile, ReleaseInfo, ReleaseManifest};
pub use platform::{classify, classify_asset, signed_name, ClassifiedAsset, Platform, PlatformSet};
pub use service::{Clock, FreshnessPolicy, ManifestService, ManualClock, SystemClock};
pub use store::{StateStores, Stats, ValidatorState};
