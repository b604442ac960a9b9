//! Update Relay Library
//!
//! Serves an auto-update manifest for the latest release of a GitHub
//! repository. Upstream is polled with conditional requests at most once per
//! freshness interval, and every state change is persisted so a restart
//! resumes with warm validators.

pub mod app;
pub mod cli;
pub mod config;
pub mod constants;
pub mod errors;
pub mod prelude;
pub mod server;

// Re-export commonly used types for convenience
pub use errors::{AppError, Result};

#[cfg(test)]
mod tests {
    use super::*;
    use constants::*;

    #[test]
    fn test_constants_accessible() {
        assert_eq!(DEFAULT_RATE_LIMIT_RPS, 5);
        assert!(USER_AGENT.contains("Update-Relay"));
        assert_eq!(env::RELEASE_REPO, "UPDATE_RELAY_RELEASE_REPO");
    }

    #[test]
    fn test_error_types() {
        let app_error = AppError::from(errors::UpstreamError::RateLimited { status: 403 });

        assert_eq!(app_error.category(), "upstream");
        assert!(app_error.is_recoverable());

        let config_error = AppError::from(errors::ConfigError::ValidationFailed { errors: vec![] });
        assert_eq!(config_error.category(), "config");
        assert!(!config_error.is_recoverable());
    }
}
