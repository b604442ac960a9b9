//! HTTP client for the GitHub REST API
//!
//! The module is organized into specialized components:
//! - `config`: HTTP client configuration and building
//! - `http`: conditional GET with rate limiting and retries
//!
//! [`GitHubClient`] knows the three resources the relay reads: the release
//! list of the release repository, the per-tag directory listing of the
//! archive repository, and raw signature bodies.

use url::Url;

use crate::app::models::{ContentEntry, ReleaseFile, ReleaseInfo};
use crate::constants::{github, http as http_constants};
use crate::errors::{UpstreamError, UpstreamResult};

pub mod config;
pub mod http;

pub use config::ClientConfig;
pub use http::{Conditional, HttpHandler};

/// Repositories and API root the relay reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// API root, e.g. `https://api.github.com`
    pub api_base_url: String,
    /// `owner/name` of the repository whose releases define the version
    pub release_repo: String,
    /// `owner/name` of the repository holding the per-tag artifact folders
    pub archive_repo: String,
    /// Path inside the archive repository under which tag folders live
    pub archive_path_prefix: String,
}

/// Client for the GitHub endpoints used by the fetcher
#[derive(Debug)]
pub struct GitHubClient {
    http_handler: HttpHandler,
    api_base: Url,
    target: UpstreamTarget,
}

impl GitHubClient {
    /// Creates a new client for `target`
    ///
    /// # Errors
    ///
    /// Returns `UpstreamError` if the API base URL is invalid or the HTTP
    /// client cannot be built
    pub fn new(target: UpstreamTarget, config: &ClientConfig) -> UpstreamResult<Self> {
        let api_base = Url::parse(&target.api_base_url).map_err(|e| UpstreamError::InvalidUrl {
            url: target.api_base_url.clone(),
            error: e.to_string(),
        })?;
        let client = config.build_http_client()?;
        let http_handler = HttpHandler::new(client, config.rate_limit_rps, config.max_retries)?;

        tracing::info!(
            "Created GitHub client for releases of {} and archives of {}",
            target.release_repo,
            target.archive_repo
        );

        Ok(Self {
            http_handler,
            api_base,
            target,
        })
    }

    pub fn target(&self) -> &UpstreamTarget {
        &self.target
    }

    /// `GET /repos/{release_repo}/releases`
    pub async fn fetch_releases(
        &self,
        etag: Option<&str>,
    ) -> UpstreamResult<Conditional<Vec<ReleaseInfo>>> {
        let url = self.api_url(&["repos"], &self.target.release_repo, &[])?;
        let url = push_segments(url, &["releases"])?;
        self.http_handler
            .conditional_get(&url, etag, Some(http_constants::GITHUB_ACCEPT))
            .await?
            .try_map(|body| decode(&url, &body))
    }

    /// `GET /repos/{archive_repo}/contents/{prefix}/{tag}`
    ///
    /// Only regular files with a download URL are returned, in listing order.
    pub async fn fetch_archive(
        &self,
        tag: &str,
        etag: Option<&str>,
    ) -> UpstreamResult<Conditional<Vec<ReleaseFile>>> {
        let prefix: Vec<&str> = self
            .target
            .archive_path_prefix
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();
        let url = self.api_url(&["repos"], &self.target.archive_repo, &["contents"])?;
        let url = push_segments(url, &prefix)?;
        let url = push_segments(url, &[tag])?;

        self.http_handler
            .conditional_get(&url, etag, Some(http_constants::GITHUB_ACCEPT))
            .await?
            .try_map(|body| -> UpstreamResult<Vec<ReleaseFile>> {
                let entries: Vec<ContentEntry> = decode(&url, &body)?;
                Ok(entries
                    .into_iter()
                    .filter(|entry| entry.entry_type == github::FILE_ENTRY_TYPE)
                    .filter_map(|entry| {
                        entry
                            .download_url
                            .map(|download_url| ReleaseFile::new(entry.name, download_url))
                    })
                    .collect())
            })
    }

    /// `GET {download_url}` for a signature file, body returned verbatim
    pub async fn fetch_signature(
        &self,
        download_url: &str,
        etag: Option<&str>,
    ) -> UpstreamResult<Conditional<String>> {
        let url = Url::parse(download_url).map_err(|e| UpstreamError::InvalidUrl {
            url: download_url.to_string(),
            error: e.to_string(),
        })?;
        self.http_handler.conditional_get(&url, etag, None).await
    }

    fn api_url(&self, head: &[&str], repo: &str, tail: &[&str]) -> UpstreamResult<Url> {
        let repo_segments: Vec<&str> = repo.split('/').filter(|s| !s.is_empty()).collect();
        let url = push_segments(self.api_base.clone(), head)?;
        let url = push_segments(url, &repo_segments)?;
        push_segments(url, tail)
    }
}

fn push_segments(mut url: Url, segments: &[&str]) -> UpstreamResult<Url> {
    let display = url.to_string();
    url.path_segments_mut()
        .map_err(|_| UpstreamError::InvalidUrl {
            url: display,
            error: "URL cannot be a base".to_string(),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn decode<T: serde::de::DeserializeOwned>(url: &Url, body: &str) -> UpstreamResult<T> {
    serde_json::from_str(body).map_err(|e| UpstreamError::Decode {
        url: url.to_string(),
        reason: e.to_string(),
    })
}
