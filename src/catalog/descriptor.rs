//! Cask descriptors and their digest/version states
//!
//! The catalog encodes state in sentinel strings (`"no_check"`, `"error"`,
//! `"latest"`). They are parsed into [`Digest`] and [`Version`] on load and
//! written back unchanged on save.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Digest value meaning "not resolved yet"
pub const UNRESOLVED_SENTINEL: &str = "no_check";

/// Digest value meaning "resolution failed permanently"
pub const FAILED_SENTINEL: &str = "error";

/// Version value meaning "whatever upstream currently serves"
pub const FLOATING_SENTINEL: &str = "latest";

/// Content digest of a cask artifact
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Digest {
    /// Needs resolution (`"no_check"`)
    #[default]
    Unresolved,
    /// Known digest
    Resolved(String),
    /// Failed resolution, with the diagnostic when one is known (`"error"`)
    Failed(String),
}

impl Digest {
    /// The digest string, if resolved
    pub fn as_resolved(&self) -> Option<&str> {
        match self {
            Self::Resolved(hash) => Some(hash),
            _ => None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, Self::Unresolved)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// The failure diagnostic, if any was recorded
    pub fn failure_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) if !message.is_empty() => Some(message),
            _ => None,
        }
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unresolved => UNRESOLVED_SENTINEL,
            Self::Resolved(hash) => hash,
            Self::Failed(_) => FAILED_SENTINEL,
        }
    }
}

impl From<String> for Digest {
    fn from(value: String) -> Self {
        match value.as_str() {
            UNRESOLVED_SENTINEL | "" => Self::Unresolved,
            FAILED_SENTINEL => Self::Failed(String::new()),
            _ => Self::Resolved(value),
        }
    }
}

impl From<Digest> for String {
    fn from(value: Digest) -> Self {
        match value {
            Digest::Resolved(hash) => hash,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Cask version
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Version {
    /// `"latest"`: re-checked on every run
    Floating,
    /// A released version; its artifact never changes
    Pinned(String),
}

impl Version {
    pub fn is_floating(&self) -> bool {
        matches!(self, Self::Floating)
    }

    /// Wire representation
    pub fn as_str(&self) -> &str {
        match self {
            Self::Floating => FLOATING_SENTINEL,
            Self::Pinned(version) => version,
        }
    }
}

impl From<String> for Version {
    fn from(value: String) -> Self {
        if value == FLOATING_SENTINEL {
            Self::Floating
        } else {
            Self::Pinned(value)
        }
    }
}

impl From<&str> for Version {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Version> for String {
    fn from(value: Version) -> Self {
        match value {
            Version::Floating => FLOATING_SENTINEL.to_string(),
            Version::Pinned(version) => version,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One catalog entry
///
/// Fields this crate does not interpret are kept in `extra` so the artifact
/// has the same shape as the catalog it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    /// Stable cask token
    #[serde(rename = "token")]
    pub identifier: String,

    pub version: Version,

    /// Artifact location handed to the oracle
    #[serde(rename = "url", default)]
    pub source_url: String,

    #[serde(rename = "sha256", default)]
    pub digest: Digest,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Descriptor {
    /// Create a descriptor with no extra fields
    pub fn new(
        identifier: impl Into<String>,
        version: impl Into<Version>,
        source_url: impl Into<String>,
        digest: Digest,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
            source_url: source_url.into(),
            digest,
            extra: serde_json::Map::new(),
        }
    }

    /// True iff the digest still has to be resolved
    pub fn needs_resolution(&self) -> bool {
        self.digest.is_unresolved()
    }
}
