//! Platform identifiers and asset filename classification
//!
//! Release assets are matched to update-client platforms purely by naming
//! convention. Classification is a rule table evaluated in a fixed order:
//! the first rule whose suffix matches and whose architecture markers are
//! satisfied wins. Architecture markers are compared as whole tokens of the
//! filename stem, so their position inside the name does not matter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Suffix carried by detached signature files
pub const SIGNATURE_SUFFIX: &str = ".sig";

/// Update-client platform identifier
///
/// The declaration order is the canonical order of manifest entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "linux-x86_64")]
    LinuxX86_64,
    #[serde(rename = "windows-x86_64")]
    WindowsX86_64,
    #[serde(rename = "windows-aarch64")]
    WindowsAarch64,
    #[serde(rename = "darwin-x86_64")]
    DarwinX86_64,
    #[serde(rename = "darwin-aarch64")]
    DarwinAarch64,
}

impl Platform {
    /// All platforms in canonical order
    pub const ALL: [Platform; 5] = [
        Platform::LinuxX86_64,
        Platform::WindowsX86_64,
        Platform::WindowsAarch64,
        Platform::DarwinX86_64,
        Platform::DarwinAarch64,
    ];

    /// Canonical identifier string
    pub fn id(&self) -> &'static str {
        match self {
            Platform::LinuxX86_64 => "linux-x86_64",
            Platform::WindowsX86_64 => "windows-x86_64",
            Platform::WindowsAarch64 => "windows-aarch64",
            Platform::DarwinX86_64 => "darwin-x86_64",
            Platform::DarwinAarch64 => "darwin-aarch64",
        }
    }

    /// Parse a canonical identifier
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.id() == id)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Architecture requirement for a rule
#[derive(Debug, Clone, Copy)]
enum Markers {
    /// Name must carry none of the given tokens
    Without(&'static [&'static str]),
    /// Name must carry at least one of the given tokens
    With(&'static [&'static str]),
}

impl Markers {
    fn satisfied_by(&self, tokens: &[String]) -> bool {
        let has = |set: &[&str]| tokens.iter().any(|t| set.contains(&t.as_str()));
        match self {
            Markers::Without(set) => !has(set),
            Markers::With(set) => has(set),
        }
    }
}

/// One naming convention
#[derive(Debug, Clone, Copy)]
struct ClassificationRule {
    suffix: &'static str,
    markers: Markers,
    platform: Platform,
}

const ARM64_MARKERS: &[&str] = &["arm64", "aarch64"];
const INTEL_MARKERS: &[&str] = &["intel", "x64"];
const SILICON_MARKERS: &[&str] = &["silicon", "aarch64", "arm64"];

/// Naming conventions, evaluated top to bottom (suffixes are lowercase)
const RULES: &[ClassificationRule] = &[
    ClassificationRule {
        suffix: ".appimage",
        markers: Markers::Without(ARM64_MARKERS),
        platform: Platform::LinuxX86_64,
    },
    ClassificationRule {
        suffix: ".msi",
        markers: Markers::With(ARM64_MARKERS),
        platform: Platform::WindowsAarch64,
    },
    ClassificationRule {
        suffix: ".msi",
        markers: Markers::Without(ARM64_MARKERS),
        platform: Platform::WindowsX86_64,
    },
    ClassificationRule {
        suffix: ".app.tar.gz",
        markers: Markers::With(INTEL_MARKERS),
        platform: Platform::DarwinX86_64,
    },
    ClassificationRule {
        suffix: ".app.tar.gz",
        markers: Markers::With(SILICON_MARKERS),
        platform: Platform::DarwinAarch64,
    },
];

/// A classified release asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedAsset {
    /// Platform the asset (or the asset it signs) belongs to
    pub platform: Platform,
    /// Whether this is a detached signature file
    pub signature: bool,
}

/// Classify an asset filename, distinguishing signature files
///
/// A trailing `.sig` is stripped once; the base name is then classified
/// like any other asset. Returns `None` for unrecognized names.
pub fn classify_asset(file_name: &str) -> Option<ClassifiedAsset> {
    let lower = file_name.to_ascii_lowercase();
    match lower.strip_suffix(SIGNATURE_SUFFIX) {
        Some(base) => classify_base(base).map(|platform| ClassifiedAsset {
            platform,
            signature: true,
        }),
        None => classify_base(&lower).map(|platform| ClassifiedAsset {
            platform,
            signature: false,
        }),
    }
}

/// Name of the file a signature file signs, `None` if `file_name` is not one
///
/// The suffix is matched case-insensitively, like classification.
pub fn signed_name(file_name: &str) -> Option<&str> {
    let split = file_name.len().checked_sub(SIGNATURE_SUFFIX.len())?;
    let (base, suffix) = (file_name.get(..split)?, file_name.get(split..)?);
    suffix.eq_ignore_ascii_case(SIGNATURE_SUFFIX).then_some(base)
}

/// Classify an asset filename into a platform, `None` meaning unknown
pub fn classify(file_name: &str) -> Option<Platform> {
    classify_asset(file_name).map(|asset| asset.platform)
}

/// Classify a lowercase, non-signature name against the rule table
fn classify_base(name: &str) -> Option<Platform> {
    RULES.iter().find_map(|rule| {
        let stem = name.strip_suffix(rule.suffix)?;
        let tokens = tokenize(stem);
        rule.markers.satisfied_by(&tokens).then_some(rule.platform)
    })
}

fn tokenize(stem: &str) -> Vec<String> {
    stem.split(|c: char| matches!(c, '-' | '_' | '.') || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Set of platforms enabled in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlatformSet {
    mask: u8,
}

impl PlatformSet {
    /// Empty set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Every known platform
    pub fn all() -> Self {
        Platform::ALL.into_iter().collect()
    }

    fn bit(platform: Platform) -> u8 {
        1 << (platform as u8)
    }

    /// Add a platform
    pub fn insert(&mut self, platform: Platform) {
        self.mask |= Self::bit(platform);
    }

    /// Whether the platform is enabled
    pub fn contains(&self, platform: Platform) -> bool {
        self.mask & Self::bit(platform) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.mask == 0
    }

    /// Enabled platforms in canonical order
    pub fn iter(&self) -> impl Iterator<Item = Platform> + '_ {
        Platform::ALL.into_iter().filter(|p| self.contains(*p))
    }
}

impl FromIterator<Platform> for PlatformSet {
    fn from_iter<I: IntoIterator<Item = Platform>>(iter: I) -> Self {
        let mut set = PlatformSet::empty();
        for platform in iter {
            set.insert(platform);
        }
        set
    }
}
