//! Three-stage conditional fetch pipeline
//!
//! A fetch cycle issues, in order:
//!
//! 1. the release list, conditional on the release token. A 304 ends the
//!    cycle with the cached manifest;
//! 2. the archive listing of the latest tag, conditional on that tag's
//!    token. A 304 ends the cycle with the cached manifest if it describes
//!    the same tag, otherwise the listing is fetched again unconditionally;
//! 3. the signature body of every selected platform asset, concurrently,
//!    each conditional on its own token. A 304 reuses the cached signature
//!    when the cached manifest holds it for the same tag and asset; a
//!    failure yields an empty signature.
//!
//! A rebuilt manifest keeps only the archive token of its tag and the
//! signature tokens of its listing, so superseded releases do not pile up
//! in `validators.json`.
//!
//! The fetcher never touches the stores. It receives a staged copy of the
//! validator state and returns the updated copy alongside the manifest, and
//! the caller commits both together.

use std::collections::{BTreeMap, HashMap};

use futures::future::join_all;
use tracing::{debug, info, warn};

use super::builder::{ManifestBuilder, PlatformFiles};
use super::client::{Conditional, GitHubClient};
use super::models::{ReleaseFile, ReleaseInfo, ReleaseManifest};
use super::platform::Platform;
use super::store::ValidatorState;
use crate::errors::{UpstreamError, UpstreamResult};

/// How a cycle produced its manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchSource {
    /// Release list answered 304
    ReleasesNotModified,
    /// Archive listing answered 304 for the cached tag
    ArchiveNotModified,
    /// Manifest rebuilt from a fresh listing
    Rebuilt,
}

/// Result of a successful fetch cycle
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub manifest: ReleaseManifest,
    pub validators: ValidatorState,
    pub source: FetchSource,
}

/// Token change produced by one signature request
#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenUpdate {
    Keep,
    Set(String),
    Clear,
}

#[derive(Debug)]
struct ResolvedSignature {
    url: String,
    signature: String,
    token: TokenUpdate,
}

/// Runs fetch cycles against the hosting API
#[derive(Debug)]
pub struct UpstreamFetcher {
    client: GitHubClient,
    builder: ManifestBuilder,
}

impl UpstreamFetcher {
    pub fn new(client: GitHubClient, builder: ManifestBuilder) -> Self {
        Self { client, builder }
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    pub fn builder(&self) -> &ManifestBuilder {
        &self.builder
    }

    /// Whether a cached manifest can anchor conditional requests
    ///
    /// A manifest built for a different enabled-platform set would violate
    /// the key-set invariant if it were returned on a 304, so it is treated
    /// as absent.
    pub fn is_usable_cache(&self, cached: &ReleaseManifest) -> bool {
        cached.is_populated()
            && cached
                .platforms
                .keys()
                .copied()
                .eq(self.builder.enabled().iter())
    }

    /// Run one fetch cycle
    ///
    /// Validator tokens are only sent when a usable cached manifest exists;
    /// without one every request is unconditional.
    pub async fn fetch_manifest(
        &self,
        cached: Option<&ReleaseManifest>,
        mut validators: ValidatorState,
    ) -> UpstreamResult<FetchOutcome> {
        let cached = cached.filter(|c| self.is_usable_cache(c));

        // Stage 1: release list
        let release_token = cached.and(validators.release_token()).map(str::to_string);
        let releases = self.client.fetch_releases(release_token.as_deref()).await?;
        let latest = match releases {
            Conditional::NotModified => {
                let cached = self.require_cached(cached, "release list")?;
                debug!("Release list unchanged; serving cached {}", cached.version);
                return Ok(FetchOutcome {
                    manifest: cached.clone(),
                    validators,
                    source: FetchSource::ReleasesNotModified,
                });
            }
            Conditional::Modified { body, etag } => {
                validators.set_release_token(etag);
                self.latest_release(body)?
            }
        };
        let tag = latest.tag_name.clone();
        debug!("Latest release is {}", tag);

        // Stage 2: archive listing for the latest tag
        let archive_token = cached.and(validators.archive_token(&tag)).map(str::to_string);
        let listing = self.client.fetch_archive(&tag, archive_token.as_deref()).await?;
        let files = match listing {
            Conditional::NotModified => match cached {
                Some(cached) if cached.version == tag => {
                    debug!("Archive listing for {} unchanged; serving cached manifest", tag);
                    return Ok(FetchOutcome {
                        manifest: cached.clone(),
                        validators,
                        source: FetchSource::ArchiveNotModified,
                    });
                }
                _ => {
                    warn!(
                        "Archive token for {} does not match cached version {}; refetching unconditionally",
                        tag,
                        cached.map(|c| c.version.as_str()).unwrap_or("<none>")
                    );
                    self.fetch_archive_unconditionally(&tag, &mut validators).await?
                }
            },
            Conditional::Modified { body, etag } => {
                validators.set_archive_token(&tag, etag);
                body
            }
        };
        debug!("Archive listing for {} has {} files", tag, files.len());

        // Stage 3: signatures of the assets that make it into the manifest
        let selected = self.builder.select(&files);
        let signatures = self
            .resolve_signatures(&tag, &selected, cached, &mut validators)
            .await;
        validators.retain_current(
            &tag,
            selected
                .values()
                .filter_map(|chosen| chosen.signature)
                .map(|sig| sig.download_url.as_str()),
        );

        let manifest = self.builder.build(&latest, &files, &signatures);
        info!(
            "Built manifest for {} with {} platform entries",
            manifest.version,
            manifest.platforms.values().filter(|a| !a.is_empty()).count()
        );

        Ok(FetchOutcome {
            manifest,
            validators,
            source: FetchSource::Rebuilt,
        })
    }

    fn require_cached<'a>(
        &self,
        cached: Option<&'a ReleaseManifest>,
        resource: &str,
    ) -> UpstreamResult<&'a ReleaseManifest> {
        cached.ok_or_else(|| UpstreamError::Indeterminate {
            url: resource.to_string(),
            reason: "304 Not Modified without a cached manifest".to_string(),
        })
    }

    fn latest_release(&self, releases: Vec<ReleaseInfo>) -> UpstreamResult<ReleaseInfo> {
        // The API lists newest first; index 0 is taken as-is
        releases
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::NoReleases {
                repo: self.client.target().release_repo.clone(),
            })
    }

    async fn fetch_archive_unconditionally(
        &self,
        tag: &str,
        validators: &mut ValidatorState,
    ) -> UpstreamResult<Vec<ReleaseFile>> {
        match self.client.fetch_archive(tag, None).await? {
            Conditional::Modified { body, etag } => {
                validators.set_archive_token(tag, etag);
                Ok(body)
            }
            Conditional::NotModified => Err(UpstreamError::Indeterminate {
                url: format!("archive listing for {}", tag),
                reason: "304 Not Modified to an unconditional request".to_string(),
            }),
        }
    }

    /// Fetch the signature of every selected asset concurrently
    ///
    /// Returns signature bodies keyed by download URL and applies the token
    /// changes to `validators`.
    async fn resolve_signatures(
        &self,
        tag: &str,
        selected: &BTreeMap<Platform, PlatformFiles<'_>>,
        cached: Option<&ReleaseManifest>,
        validators: &mut ValidatorState,
    ) -> HashMap<String, String> {
        let requests = selected.iter().filter_map(|(&platform, chosen)| {
            let file = chosen.signature?;
            // Only a signature cached for this very asset may be reused
            let reusable = cached
                .filter(|c| c.version == tag)
                .and_then(|c| c.platforms.get(&platform))
                .filter(|asset| asset.url == chosen.base.download_url)
                .map(|asset| asset.signature.as_str())
                .filter(|sig| !sig.is_empty());
            let token = cached.and(validators.signature_token(&file.download_url));
            Some(self.resolve_signature(file, platform, token, reusable))
        });
        let resolved = join_all(requests).await;

        let mut signatures = HashMap::new();
        for ResolvedSignature {
            url,
            signature,
            token,
        } in resolved
        {
            match token {
                TokenUpdate::Keep => {}
                TokenUpdate::Set(token) => validators.set_signature_token(&url, Some(token)),
                TokenUpdate::Clear => validators.set_signature_token(&url, None::<String>),
            }
            signatures.insert(url, signature);
        }
        signatures
    }

    async fn resolve_signature(
        &self,
        file: &ReleaseFile,
        platform: Platform,
        token: Option<&str>,
        reusable: Option<&str>,
    ) -> ResolvedSignature {
        let url = file.download_url.clone();

        let first = self.client.fetch_signature(&url, token).await;
        let result = match first {
            Ok(Conditional::NotModified) => match reusable {
                Some(signature) => {
                    debug!("Signature for {} unchanged", platform);
                    return ResolvedSignature {
                        url,
                        signature: signature.to_string(),
                        token: TokenUpdate::Keep,
                    };
                }
                None => {
                    debug!(
                        "Signature {} unchanged but no cached value; refetching unconditionally",
                        file.name
                    );
                    self.client.fetch_signature(&url, None).await
                }
            },
            other => other,
        };

        match result {
            Ok(Conditional::Modified { body, etag }) => ResolvedSignature {
                url,
                signature: body,
                token: etag.map_or(TokenUpdate::Clear, TokenUpdate::Set),
            },
            Ok(Conditional::NotModified) => {
                warn!("Signature {} answered 304 to an unconditional request", file.name);
                ResolvedSignature {
                    url,
                    signature: String::new(),
                    token: TokenUpdate::Clear,
                }
            }
            Err(e) => {
                warn!("Failed to fetch signature {}: {}", file.name, e);
                ResolvedSignature {
                    url,
                    signature: String::new(),
                    token: TokenUpdate::Clear,
                }
            }
        }
    }
}
