//! Shared fixtures for the integration tests
//!
//! Upstream is a mockito server standing in for both the GitHub API and the
//! raw-content host serving signature files.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use mockito::{Matcher, Mock, ServerGuard};

use update_relay::app::{
    ClientConfig, FreshnessPolicy, GitHubClient, ManifestBuilder, ManifestService, ManualClock,
    PlatformSet, StateStores, UpstreamFetcher, UpstreamTarget,
};
use update_relay::config::PlatformsConfig;

pub const RELEASE_REPO: &str = "acme/app";
pub const ARCHIVE_REPO: &str = "acme/app-builds";
pub const RELEASES_PATH: &str = "/repos/acme/app/releases";
pub const TAG: &str = "v1.0.0";

pub fn archive_path(tag: &str) -> String {
    format!("/repos/{}/contents/builds/{}", ARCHIVE_REPO, tag)
}

pub fn target(server: &ServerGuard) -> UpstreamTarget {
    UpstreamTarget {
        api_base_url: server.url(),
        release_repo: RELEASE_REPO.to_string(),
        archive_repo: ARCHIVE_REPO.to_string(),
        archive_path_prefix: "builds".to_string(),
    }
}

pub fn client_config() -> ClientConfig {
    ClientConfig {
        rate_limit_rps: 1000,
        max_retries: 0,
        request_timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    }
}

/// Default platform selection: everything except Windows on ARM
pub fn default_platforms() -> PlatformSet {
    PlatformsConfig::default().enabled()
}

pub fn fetcher(server: &ServerGuard) -> UpstreamFetcher {
    UpstreamFetcher::new(
        GitHubClient::new(target(server), &client_config()).unwrap(),
        ManifestBuilder::new(default_platforms(), "Bug fixes"),
    )
}

pub async fn service(server: &ServerGuard, state_dir: &Path) -> (Arc<ManifestService>, Arc<ManualClock>) {
    let stores = StateStores::open(state_dir, RELEASE_REPO).await.unwrap();
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    ));
    let service = ManifestService::new(
        stores,
        fetcher(server),
        FreshnessPolicy::new(Duration::from_secs(300)),
        "UptimeRobot",
    )
    .with_clock(clock.clone());
    (Arc::new(service), clock)
}

pub fn raw_url(server: &ServerGuard, name: &str) -> String {
    format!("{}/raw/{}", server.url(), name)
}

/// Contents listing of `names`, served from `/raw/{folder}`
pub fn listing_in(server: &ServerGuard, folder: &str, names: &[&str]) -> String {
    let entries: Vec<String> = names.iter().map(|name| file_entry(server, folder, name)).collect();
    format!("[{}]", entries.join(","))
}

fn file_entry(server: &ServerGuard, folder: &str, name: &str) -> String {
    format!(
        r#"{{"name": "{}", "type": "file", "download_url": "{}"}}"#,
        name,
        raw_url(server, &format!("{}{}", folder, name))
    )
}

/// Listing of the v1.0.0 folder
///
/// The silicon signature precedes its base asset and must be dropped; the
/// ARM64 installer belongs to a disabled platform.
pub fn listing(server: &ServerGuard) -> String {
    let files = [
        "App_1.0.0_amd64.AppImage",
        "App_1.0.0_amd64.AppImage.sig",
        "App_1.0.0_x64_en-US.msi",
        "App_1.0.0_x64_en-US.msi.sig",
        "App_1.0.0_arm64_en-US.msi",
        "App_1.0.0_arm64_en-US.msi.sig",
        "App_silicon.app.tar.gz.sig",
        "App_silicon.app.tar.gz",
        "App_intel.app.tar.gz",
        "App_intel.app.tar.gz.sig",
        "README.md",
    ];
    let mut entries: Vec<String> = files.iter().map(|name| file_entry(server, "", name)).collect();
    entries.push(r#"{"name": "old", "type": "dir", "download_url": null}"#.to_string());
    format!("[{}]", entries.join(","))
}

pub fn releases_body(tag: &str) -> String {
    format!(
        r#"[
            {{"tag_name": "{}", "name": "App {}", "published_at": "2024-05-01T10:00:00Z", "draft": false, "prerelease": false}},
            {{"tag_name": "v0.9.0", "name": "App 0.9.0", "published_at": "2024-04-01T10:00:00Z"}}
        ]"#,
        tag, tag
    )
}

/// Unconditional release list answering with `etag`
pub async fn mock_releases(server: &mut ServerGuard, tag: &str, etag: &str) -> Mock {
    server
        .mock("GET", RELEASES_PATH)
        .match_header("if-none-match", Matcher::Missing)
        .with_status(200)
        .with_header("etag", etag)
        .with_body(releases_body(tag))
        .create_async()
        .await
}

/// Unconditional archive listing of `tag`
pub async fn mock_archive(server: &mut ServerGuard, tag: &str, etag: &str) -> Mock {
    let body = listing(server);
    mock_archive_body(server, tag, etag, body).await
}

/// Unconditional archive listing of `tag` answering with `body`
pub async fn mock_archive_body(server: &mut ServerGuard, tag: &str, etag: &str, body: String) -> Mock {
    server
        .mock("GET", archive_path(tag).as_str())
        .match_header("if-none-match", Matcher::Missing)
        .with_status(200)
        .with_header("etag", etag)
        .with_body(body)
        .create_async()
        .await
}

/// Unconditional signature body
pub async fn mock_signature(server: &mut ServerGuard, name: &str, body: &str, etag: &str) -> Mock {
    server
        .mock("GET", format!("/raw/{}", name).as_str())
        .match_header("if-none-match", Matcher::Missing)
        .with_status(200)
        .with_header("etag", etag)
        .with_body(body)
        .create_async()
        .await
}

/// Conditional request carrying `etag` answered with 304
pub async fn mock_not_modified(server: &mut ServerGuard, path: &str, etag: &str) -> Mock {
    server
        .mock("GET", path)
        .match_header("if-none-match", etag)
        .with_status(304)
        .create_async()
        .await
}

/// Everything a cold fetch of v1.0.0 needs
///
/// The silicon signature is never paired, so it needs no mock.
pub async fn mock_cold_fetch(server: &mut ServerGuard) -> Vec<Mock> {
    vec![
        mock_releases(server, TAG, "\"r1\"").await,
        mock_archive(server, TAG, "\"a1\"").await,
        mock_signature(server, "App_1.0.0_amd64.AppImage.sig", "sig-linux", "\"s-linux\"").await,
        mock_signature(server, "App_1.0.0_x64_en-US.msi.sig", "sig-windows", "\"s-windows\"").await,
        mock_signature(server, "App_intel.app.tar.gz.sig", "sig-intel", "\"s-intel\"").await,
    ]
}
