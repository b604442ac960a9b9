//! Data models for manifests and upstream API payloads
//!
//! `ReleaseManifest` is the document served to update clients. The upstream
//! types mirror the subset of the GitHub REST API responses the relay reads.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

use super::platform::Platform;

/// Download descriptor for one platform
///
/// Both fields stay empty until an asset is found. A fully empty descriptor
/// serializes as `{}`, which update clients read as "no update for this
/// platform".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformAsset {
    pub url: String,
    pub signature: String,
}

impl PlatformAsset {
    /// Descriptor for a base asset whose signature is not known yet
    pub fn with_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            signature: String::new(),
        }
    }

    /// Whether no asset was found for the platform
    pub fn is_empty(&self) -> bool {
        self.url.is_empty() && self.signature.is_empty()
    }
}

impl Serialize for PlatformAsset {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_empty() {
            return serializer.serialize_map(Some(0))?.end();
        }
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("signature", &self.signature)?;
        map.serialize_entry("url", &self.url)?;
        map.end()
    }
}

/// Update manifest for the latest release
///
/// `platforms` is keyed by [`Platform`], whose ordering is the canonical
/// manifest order, so serialization always emits entries in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseManifest {
    pub version: String,
    pub notes: String,
    pub pub_date: String,
    pub platforms: BTreeMap<Platform, PlatformAsset>,
}

impl ReleaseManifest {
    /// Whether this is a real manifest rather than the `{}` bootstrap document
    pub fn is_populated(&self) -> bool {
        !self.version.is_empty()
    }

    /// Signature recorded for a platform, if non-empty
    pub fn signature_for(&self, platform: Platform) -> Option<&str> {
        self.platforms
            .get(&platform)
            .map(|asset| asset.signature.as_str())
            .filter(|sig| !sig.is_empty())
    }
}

/// Entry of the GitHub release list
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseInfo {
    pub tag_name: String,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub prerelease: bool,
}

/// Entry of a GitHub repository contents listing
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentEntry {
    pub name: String,
    #[serde(rename = "type", default)]
    pub entry_type: String,
    #[serde(default)]
    pub download_url: Option<String>,
}

/// Release asset ready for classification
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseFile {
    pub name: String,
    pub download_url: String,
}

impl ReleaseFile {
    pub fn new(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_asset_serializes_as_empty_object() {
        let json = serde_json::to_string(&PlatformAsset::default()).unwrap();
        assert_eq!(json, "{}");

        let asset = PlatformAsset::with_url("https://example.com/App.msi");
        let json = serde_json::to_string(&asset).unwrap();
        assert_eq!(
            json,
            r#"{"signature":"","url":"https://example.com/App.msi"}"#
        );
    }

    #[test]
    fn test_manifest_platform_order_is_canonical() {
        let mut manifest = ReleaseManifest {
            version: "v1.0.0".to_string(),
            ..Default::default()
        };
        manifest
            .platforms
            .insert(Platform::DarwinAarch64, PlatformAsset::default());
        manifest
            .platforms
            .insert(Platform::LinuxX86_64, PlatformAsset::default());

        let json = serde_json::to_string(&manifest).unwrap();
        let linux = json.find("linux-x86_64").unwrap();
        let darwin = json.find("darwin-aarch64").unwrap();
        assert!(linux < darwin);
    }

    #[test]
    fn test_bootstrap_document_is_not_populated() {
        let manifest: ReleaseManifest = serde_json::from_str("{}").unwrap();
        assert!(!manifest.is_populated());
        assert!(manifest.platforms.is_empty());
    }

    #[test]
    fn test_manifest_deserializes_empty_descriptors() {
        let json = r#"{
            "version": "v2.0.0",
            "notes": "n",
            "pub_date": "2024-05-01T10:00:00Z",
            "platforms": {
                "linux-x86_64": {"signature": "sig", "url": "u"},
                "windows-x86_64": {}
            }
        }"#;
        let manifest: ReleaseManifest = serde_json::from_str(json).unwrap();
        assert!(manifest.is_populated());
        assert_eq!(manifest.signature_for(Platform::LinuxX86_64), Some("sig"));
        assert_eq!(manifest.signature_for(Platform::WindowsX86_64), None);
        assert!(manifest.platforms[&Platform::WindowsX86_64].is_empty());
    }

    #[test]
    fn test_content_entry_parses_github_shape() {
        let json = r#"{"name": "App.msi", "type": "file", "download_url": "https://raw/App.msi", "sha": "x"}"#;
        let entry: ContentEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.entry_type, "file");
        assert_eq!(entry.download_url.as_deref(), Some("https://raw/App.msi"));
    }
}
