//! Configuration management for Update Relay
//!
//! Configuration is read from a YAML or TOML file (chosen by extension),
//! then selected keys are overridden from the environment, then the result
//! is validated. Every section has defaults, so only
//! `upstream.release_repo` must be provided.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::app::client::{ClientConfig, UpstreamTarget};
use crate::app::platform::{Platform, PlatformSet};
use crate::constants::{env, files, github, http, limits, manifest, server};
use crate::errors::{ConfigError, ConfigResult};

/// Unified application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Repositories to read releases and artifacts from
    pub upstream: UpstreamConfig,
    /// HTTP endpoint settings
    pub server: ServerConfig,
    /// Platforms included in the manifest
    pub platforms: PlatformsConfig,
    /// Freshness and state persistence
    pub cache: CacheConfig,
    /// Upstream HTTP client settings
    pub client: ClientSettings,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// `owner/name` of the repository whose latest release is served
    pub release_repo: String,
    /// `owner/name` of the repository holding per-tag artifact folders;
    /// defaults to `release_repo`
    pub archive_repo: Option<String>,
    pub api_base_url: String,
    /// Directory inside the archive repository that contains the tag folders
    pub archive_path_prefix: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            release_repo: String::new(),
            archive_repo: None,
            api_base_url: github::API_BASE_URL.to_string(),
            archive_path_prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    /// User-Agent substring of monitoring probes, which are not counted
    pub health_check_agent: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: server::DEFAULT_BIND_ADDRESS.to_string(),
            port: server::DEFAULT_PORT,
            health_check_agent: server::DEFAULT_HEALTH_CHECK_AGENT.to_string(),
        }
    }
}

/// One switch per supported platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    pub linux: bool,
    pub windows: bool,
    pub windows_arm64: bool,
    pub darwin_intel: bool,
    pub darwin_silicon: bool,
}

impl Default for PlatformsConfig {
    fn default() -> Self {
        Self {
            linux: true,
            windows: true,
            windows_arm64: false,
            darwin_intel: true,
            darwin_silicon: true,
        }
    }
}

impl PlatformsConfig {
    /// Set of enabled platforms
    pub fn enabled(&self) -> PlatformSet {
        [
            (self.linux, Platform::LinuxX86_64),
            (self.windows, Platform::WindowsX86_64),
            (self.windows_arm64, Platform::WindowsAarch64),
            (self.darwin_intel, Platform::DarwinX86_64),
            (self.darwin_silicon, Platform::DarwinAarch64),
        ]
        .into_iter()
        .filter_map(|(enabled, platform)| enabled.then_some(platform))
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Minimum time between two fetch cycles, e.g. `5m`
    #[serde(with = "humantime_serde")]
    pub min_interval: Duration,
    /// Directory holding the state files; defaults to the user data dir
    pub state_dir: Option<PathBuf>,
    /// Release notes placed in every manifest
    pub notes: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_interval: manifest::DEFAULT_MIN_INTERVAL,
            state_dir: None,
            notes: manifest::DEFAULT_NOTES.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    #[serde(with = "humantime_serde")]
    pub connect_timeout: Duration,
    /// Outbound requests per second
    pub rate_limit_rps: u32,
    /// Retry attempts for transient failures
    pub max_retries: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            request_timeout: http::DEFAULT_TIMEOUT,
            connect_timeout: http::CONNECT_TIMEOUT,
            rate_limit_rps: limits::DEFAULT_RATE_LIMIT_RPS,
            max_retries: limits::MAX_RETRIES,
        }
    }
}

impl ClientSettings {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            request_timeout: self.request_timeout,
            connect_timeout: self.connect_timeout,
            rate_limit_rps: self.rate_limit_rps,
            max_retries: self.max_retries,
            ..ClientConfig::default()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default log level: error, warn, info, debug or trace
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// File formats accepted for configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Format implied by the file extension
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml") | Some("yml") => Ok(Self::Yaml),
            Some("toml") => Ok(Self::Toml),
            _ => Err(ConfigError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

impl AppConfig {
    /// Load, override from the environment, and validate
    ///
    /// An explicitly requested file must exist. Without one the standard
    /// locations are searched, falling back to defaults (which still need
    /// the release repository from the environment to validate).
    pub async fn load(config_file_override: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = match config_file_override {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound { path });
                }
                Self::load_from_file(&path).await?
            }
            None => match Self::find_config_file() {
                Some(path) => Self::load_from_file(&path).await?,
                None => {
                    debug!("No config file found in standard locations; using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> ConfigResult<Self> {
        match format {
            ConfigFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            ConfigFormat::Toml => Ok(toml::from_str(content)?),
        }
    }

    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let format = ConfigFormat::from_path(path)?;
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|e| ConfigError::Unreadable {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        let config = Self::parse(&content, format)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }

    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![
            PathBuf::from("./update-relay.yaml"),
            PathBuf::from("./update-relay.toml"),
        ];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// Per-user config file location
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(files::APP_DIR_NAME).join("config.toml"))
    }

    /// Apply environment overrides through `lookup`
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ConfigResult<()> {
        if let Some(repo) = lookup(env::RELEASE_REPO) {
            self.upstream.release_repo = repo;
        }
        if let Some(repo) = lookup(env::ARCHIVE_REPO) {
            self.upstream.archive_repo = Some(repo);
        }
        if let Some(port) = lookup(env::PORT) {
            self.server.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "server.port".to_string(),
                value: port.clone(),
                reason: format!("{} must be a port number", env::PORT),
            })?;
        }
        if let Some(dir) = lookup(env::STATE_DIR) {
            self.cache.state_dir = Some(PathBuf::from(dir));
        }
        Ok(())
    }

    /// Check the configuration, reporting every problem at once
    pub fn validate(&self) -> ConfigResult<()> {
        let mut errors = Vec::new();

        if self.upstream.release_repo.trim().is_empty() {
            errors.push(format!(
                "upstream.release_repo is required (or set {})",
                env::RELEASE_REPO
            ));
        } else if !is_repo_slug(&self.upstream.release_repo) {
            errors.push(format!(
                "upstream.release_repo '{}' must have the form owner/name",
                self.upstream.release_repo
            ));
        }
        if let Some(repo) = &self.upstream.archive_repo {
            if !is_repo_slug(repo) {
                errors.push(format!(
                    "upstream.archive_repo '{}' must have the form owner/name",
                    repo
                ));
            }
        }
        if Url::parse(&self.upstream.api_base_url).is_err() {
            errors.push(format!(
                "upstream.api_base_url '{}' is not a valid URL",
                self.upstream.api_base_url
            ));
        }
        if self.platforms.enabled().is_empty() {
            errors.push("at least one platform must be enabled".to_string());
        }
        if self.client.rate_limit_rps == 0 {
            errors.push("client.rate_limit_rps must be greater than zero".to_string());
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            errors.push(format!(
                "logging.level '{}' must be one of {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationFailed { errors })
        }
    }

    pub fn enabled_platforms(&self) -> PlatformSet {
        self.platforms.enabled()
    }

    pub fn upstream_target(&self) -> UpstreamTarget {
        UpstreamTarget {
            api_base_url: self.upstream.api_base_url.clone(),
            release_repo: self.upstream.release_repo.clone(),
            archive_repo: self
                .upstream
                .archive_repo
                .clone()
                .unwrap_or_else(|| self.upstream.release_repo.clone()),
            archive_path_prefix: self.upstream.archive_path_prefix.clone(),
        }
    }

    pub fn client_config(&self) -> ClientConfig {
        self.client.to_runtime_config()
    }

    /// Resolved state directory
    pub fn state_dir(&self) -> PathBuf {
        self.cache.state_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|dir| dir.join(files::APP_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from("./state"))
        })
    }
}

fn is_repo_slug(repo: &str) -> bool {
    let mut parts = repo.split('/');
    matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None)
            if !owner.is_empty()
                && !name.is_empty()
                && !repo.chars().any(char::is_whitespace)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.upstream.release_repo = "acme/app".to_string();
        config
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.health_check_agent, "UptimeRobot");
        assert_eq!(config.cache.min_interval, Duration::from_secs(300));
        assert_eq!(config.client.rate_limit_rps, limits::DEFAULT_RATE_LIMIT_RPS);
        assert!(!config.platforms.windows_arm64);
        assert_eq!(config.enabled_platforms().iter().count(), 4);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
upstream:
  release_repo: acme/app
  archive_repo: acme/app-builds
  archive_path_prefix: releases
platforms:
  windows_arm64: true
  linux: false
cache:
  min_interval: 90s
"#;
        let config = AppConfig::parse(yaml, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.cache.min_interval, Duration::from_secs(90));
        assert!(config.enabled_platforms().contains(Platform::WindowsAarch64));
        assert!(!config.enabled_platforms().contains(Platform::LinuxX86_64));

        let target = config.upstream_target();
        assert_eq!(target.archive_repo, "acme/app-builds");
        assert_eq!(target.archive_path_prefix, "releases");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[upstream]
release_repo = "acme/app"

[client]
request_timeout = "30s"
max_retries = 4

[logging]
level = "debug"
"#;
        let config = AppConfig::parse(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.client.request_timeout, Duration::from_secs(30));
        assert_eq!(config.client_config().max_retries, 4);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.upstream_target().archive_repo, "acme/app");
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("relay.YML")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("relay.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert!(matches!(
            ConfigFormat::from_path(Path::new("relay.json")),
            Err(ConfigError::UnsupportedFormat { .. })
        ));
    }

    #[test]
    fn test_validation_collects_errors() {
        let mut config = AppConfig::default();
        config.client.rate_limit_rps = 0;
        config.platforms = PlatformsConfig {
            linux: false,
            windows: false,
            windows_arm64: false,
            darwin_intel: false,
            darwin_silicon: false,
        };

        match config.validate() {
            Err(ConfigError::ValidationFailed { errors }) => assert_eq!(errors.len(), 3),
            other => panic!("expected validation failure, got {:?}", other),
        }
    }

    #[test]
    fn test_repo_slug_validation() {
        assert!(is_repo_slug("acme/app"));
        assert!(!is_repo_slug("acme"));
        assert!(!is_repo_slug("acme/app/extra"));
        assert!(!is_repo_slug("/app"));
        assert!(!is_repo_slug("acme/my app"));

        let mut config = valid();
        config.upstream.archive_repo = Some("builds".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_environment_overrides() {
        let vars: HashMap<&str, &str> = [
            (env::RELEASE_REPO, "acme/other"),
            (env::PORT, "8080"),
            (env::STATE_DIR, "/var/lib/relay"),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.upstream.release_repo, "acme/other");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.state_dir(), PathBuf::from("/var/lib/relay"));

        let err = config
            .apply_overrides(|key| (key == env::PORT).then(|| "http".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_config_loading_nonexistent_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let result = AppConfig::load(Some(config_path)).await;
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_config_loading_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("relay.toml");
        tokio::fs::write(
            &config_path,
            "[upstream]\nrelease_repo = \"acme/app\"\n\n[server]\nport = 4000\n",
        )
        .await
        .unwrap();

        let config = AppConfig::load_from_file(&config_path).await.unwrap();
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.bind_address, server::DEFAULT_BIND_ADDRESS);
    }

    #[tokio::test]
    async fn test_invalid_yaml_reported() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("relay.yaml");
        tokio::fs::write(&config_path, "server: [unclosed").await.unwrap();

        let result = AppConfig::load_from_file(&config_path).await;
        assert!(matches!(result, Err(ConfigError::InvalidYaml(_))));
    }
}
