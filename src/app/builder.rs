//! Manifest assembly from a classified release listing
//!
//! The builder is a pure transform: it never performs I/O. Signature bodies
//! are resolved beforehand by the fetcher and handed in as a map keyed by
//! the signature file's download URL.

use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::models::{PlatformAsset, ReleaseFile, ReleaseInfo, ReleaseManifest};
use super::platform::{classify_asset, signed_name, Platform, PlatformSet};

/// Files chosen for one platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformFiles<'a> {
    /// First base asset of the platform in listing order
    pub base: &'a ReleaseFile,
    /// Signature of exactly that asset, if it was listed after it
    pub signature: Option<&'a ReleaseFile>,
}

/// Assembles [`ReleaseManifest`] values for a fixed set of enabled platforms
#[derive(Debug, Clone)]
pub struct ManifestBuilder {
    enabled: PlatformSet,
    notes: String,
}

impl ManifestBuilder {
    pub fn new(enabled: PlatformSet, notes: impl Into<String>) -> Self {
        Self {
            enabled,
            notes: notes.into(),
        }
    }

    pub fn enabled(&self) -> PlatformSet {
        self.enabled
    }

    /// Pick the base asset and its signature for every enabled platform
    ///
    /// Files are processed in listing order and the first base asset of a
    /// platform wins. A signature is paired only with the base asset whose
    /// name it carries, and only if that asset was listed before it.
    pub fn select<'a>(&self, files: &'a [ReleaseFile]) -> BTreeMap<Platform, PlatformFiles<'a>> {
        let mut selected: BTreeMap<Platform, PlatformFiles<'a>> = BTreeMap::new();

        for file in files {
            let Some(asset) = classify_asset(&file.name) else {
                continue;
            };
            if !self.enabled.contains(asset.platform) {
                continue;
            }

            if !asset.signature {
                selected.entry(asset.platform).or_insert(PlatformFiles {
                    base: file,
                    signature: None,
                });
                continue;
            }

            match selected.get_mut(&asset.platform) {
                Some(entry)
                    if entry.signature.is_none()
                        && signed_name(&file.name) == Some(entry.base.name.as_str()) =>
                {
                    entry.signature = Some(file);
                }
                Some(entry) => debug!(
                    "Dropping signature {}: {} asset is {}",
                    file.name, asset.platform, entry.base.name
                ),
                None => debug!(
                    "Dropping signature {} with no preceding {} asset",
                    file.name, asset.platform
                ),
            }
        }
        selected
    }

    /// Build the manifest for `release` from its file listing
    ///
    /// `signatures` maps signature download URLs to their bodies. Every
    /// enabled platform appears in the result, with an empty descriptor when
    /// no asset matched.
    pub fn build(
        &self,
        release: &ReleaseInfo,
        files: &[ReleaseFile],
        signatures: &HashMap<String, String>,
    ) -> ReleaseManifest {
        let mut found: BTreeMap<Platform, PlatformAsset> = self
            .select(files)
            .into_iter()
            .map(|(platform, chosen)| {
                let mut asset = PlatformAsset::with_url(&chosen.base.download_url);
                if let Some(sig) = chosen.signature {
                    asset.signature = signatures.get(&sig.download_url).cloned().unwrap_or_default();
                }
                (platform, asset)
            })
            .collect();

        let platforms = self
            .enabled
            .iter()
            .map(|platform| (platform, found.remove(&platform).unwrap_or_default()))
            .collect();

        ReleaseManifest {
            version: release.tag_name.clone(),
            notes: self.notes.clone(),
            pub_date: release.published_at.clone().unwrap_or_default(),
            platforms,
        }
    }
}
