//! API version identifiers

use semver::{BuildMetadata, Prerelease, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConversionError;

/// API group shared by every AzureMachine version
pub const GROUP: &str = "infrastructure.cluster.x-k8s.io";

/// A supported AzureMachine API version.
///
/// Variants are declared oldest first, so the derived ordering matches
/// Kubernetes version priority (alpha < beta < GA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ApiVersion {
    V1Alpha3,
    V1Alpha4,
    V1Beta1,
}

impl ApiVersion {
    /// The hub version every conversion routes through
    pub const HUB: ApiVersion = ApiVersion::V1Beta1;

    /// All supported versions, oldest first
    pub const ALL: [ApiVersion; 3] = [ApiVersion::V1Alpha3, ApiVersion::V1Alpha4, ApiVersion::V1Beta1];

    /// Parse a bare ("v1alpha4") or group-qualified
    /// ("infrastructure.cluster.x-k8s.io/v1alpha4") version string
    pub fn parse(version_str: &str) -> Result<Self, ConversionError> {
        let bare = match version_str.split_once('/') {
            Some((group, version)) if group == GROUP => version,
            Some(_) => return Err(ConversionError::UnsupportedVersion(version_str.to_string())),
            None => version_str,
        };

        // Reject strings that are not Kubernetes versions at all before matching
        to_semver(bare).map_err(|_| ConversionError::UnsupportedVersion(version_str.to_string()))?;

        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == bare)
            .ok_or_else(|| ConversionError::UnsupportedVersion(version_str.to_string()))
    }

    /// Get the bare version string (e.g. "v1alpha4")
    pub fn as_str(&self) -> &'static str {
        match self {
            ApiVersion::V1Alpha3 => "v1alpha3",
            ApiVersion::V1Alpha4 => "v1alpha4",
            ApiVersion::V1Beta1 => "v1beta1",
        }
    }

    /// Get the group-qualified apiVersion string
    pub fn api_version(&self) -> String {
        format!("{}/{}", GROUP, self.as_str())
    }

    /// Check if this is the hub version
    pub fn is_hub(&self) -> bool {
        *self == Self::HUB
    }

    /// Spoke versions, oldest first
    pub fn spokes() -> impl Iterator<Item = ApiVersion> {
        Self::ALL.into_iter().filter(|v| !v.is_hub())
    }

    /// Semantic version equivalent (e.g. v1alpha4 -> 1.0.0-alpha.4)
    pub fn semver(&self) -> Result<Version, semver::Error> {
        to_semver(self.as_str())
    }
}

/// Translate a Kubernetes version string (`v<major>[(alpha|beta)<n>]`) into semver
pub fn to_semver(kube_version: &str) -> Result<Version, semver::Error> {
    let rest = kube_version.strip_prefix('v').unwrap_or(kube_version);
    let split = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
    let (major, stage) = rest.split_at(split);

    // Let semver produce the error for an empty or malformed major component
    let major: u64 = match major.parse() {
        Ok(m) => m,
        Err(_) => return Version::parse(kube_version),
    };

    let pre = if stage.is_empty() {
        Prerelease::EMPTY
    } else {
        let level = stage.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        let name = &stage[..stage.len() - level.len()];
        if !matches!(name, "alpha" | "beta") || level.is_empty() {
            return Version::parse(kube_version);
        }
        Prerelease::new(&format!("{}.{}", name, level))?
    };

    Ok(Version {
        major,
        minor: 0,
        patch: 0,
        pre,
        build: BuildMetadata::EMPTY,
    })
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApiVersion {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = ConversionError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<ApiVersion> for String {
    fn from(v: ApiVersion) -> Self {
        v.api_version()
    }
}
