//! Error types for Update Relay
//!
//! This module defines the error types for every component of the relay.
//! Upstream and persistence errors never reach update clients: the request
//! path degrades to cached data, so these types mostly exist to be logged
//! with enough context for an operator to act on them.

use std::path::PathBuf;
use thiserror::Error;

/// Errors talking to the hosting provider's API
#[derive(Error, Debug)]
pub enum UpstreamError {
    /// Transport failure, timeout, or 5xx response
    #[error("Upstream unavailable: {reason}")]
    Unavailable {
        reason: String,
        status: Option<u16>,
    },

    /// HTTP 403 or 429 from the API, almost always the anonymous rate limit
    #[error("Upstream rate limit hit (HTTP {status}). Requests are being throttled by the provider")]
    RateLimited { status: u16 },

    /// Any other non-2xx, non-304 status
    #[error("Unexpected upstream response: HTTP {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// The release list was empty
    #[error("Repository {repo} has no releases")]
    NoReleases { repo: String },

    /// A 304 could not be reconciled with the cached manifest even after an
    /// unconditional retry
    #[error("Indeterminate upstream state for {url}: {reason}")]
    Indeterminate { url: String, reason: String },

    /// Response body could not be decoded
    #[error("Failed to decode upstream response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Invalid URL built from configuration
    #[error("Invalid upstream URL: {url} - {error}")]
    InvalidUrl { url: String, error: String },
}

impl UpstreamError {
    /// HTTP status associated with the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            UpstreamError::Unavailable { status, .. } => *status,
            UpstreamError::RateLimited { status } => Some(*status),
            UpstreamError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a later attempt may succeed without operator action
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UpstreamError::Unavailable { .. } | UpstreamError::RateLimited { .. }
        )
    }

    /// Whether the provider is throttling us
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, UpstreamError::RateLimited { .. })
    }
}

impl From<reqwest::Error> for UpstreamError {
    fn from(error: reqwest::Error) -> Self {
        UpstreamError::Unavailable {
            status: error.status().map(|s| s.as_u16()),
            reason: error.to_string(),
        }
    }
}

/// Durable state persistence errors
#[derive(Error, Debug)]
pub enum StoreError {
    /// State directory could not be created or accessed
    #[error("State directory not accessible: {path}")]
    DirectoryNotAccessible { path: PathBuf },

    /// I/O error reading or writing a state file
    #[error("I/O error on state file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// State file contains invalid JSON
    #[error("Corrupt state file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Serialization failed before writing
    #[error("Failed to serialize state for {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    NotFound { path: PathBuf },

    /// Configuration file could not be read
    #[error("Failed to read configuration file {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    /// Invalid TOML configuration
    #[error("Invalid TOML configuration")]
    InvalidToml(#[from] toml::de::Error),

    /// Invalid YAML configuration
    #[error("Invalid YAML configuration")]
    InvalidYaml(#[from] serde_yaml::Error),

    /// Unsupported configuration file extension
    #[error("Unsupported configuration format for {path}. Use .yaml, .yml or .toml")]
    UnsupportedFormat { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value for {field}: {value}. {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {errors:?}")]
    ValidationFailed { errors: Vec<String> },
}

/// Top-level application error that can represent any error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Upstream API error
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    /// State persistence error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Generic I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Generic application error with context
    #[error("Application error: {message}")]
    Generic { message: String },
}

impl AppError {
    /// Create a generic application error with a message
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Check if the error is recoverable (transient)
    pub fn is_recoverable(&self) -> bool {
        match self {
            AppError::Upstream(e) => e.is_retryable(),
            AppError::Store(StoreError::Io { .. }) => true,
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> &'static str {
        match self {
            AppError::Upstream(_) => "upstream",
            AppError::Store(_) => "store",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Generic { .. } => "generic",
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

/// Upstream result type alias
pub type UpstreamResult<T> = std::result::Result<T, UpstreamError>;

/// Store result type alias
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Config result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
