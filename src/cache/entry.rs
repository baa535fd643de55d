//! Cache keys, entries and their on-disk record

use crate::catalog::{Descriptor, Digest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `(token, version)` identity of a cached resolution
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey {
    pub identifier: String,
    pub version: String,
}

impl CacheKey {
    pub fn new(identifier: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            version: version.into(),
        }
    }

    /// Key for a catalog descriptor
    pub fn of(descriptor: &Descriptor) -> Self {
        Self::new(descriptor.identifier.as_str(), descriptor.version.as_str())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.identifier, self.version)
    }
}

/// A remembered resolution: a digest or a sticky failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub digest: Digest,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl CacheEntry {
    pub fn resolved(hash: impl Into<String>) -> Self {
        Self {
            digest: Digest::Resolved(hash.into()),
            resolved_at: Some(Utc::now()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            digest: Digest::Failed(message.into()),
            resolved_at: Some(Utc::now()),
        }
    }

    pub fn is_failure(&self) -> bool {
        self.digest.is_failed()
    }

    /// Diagnostic recorded with a failure
    pub fn error(&self) -> Option<&str> {
        self.digest.failure_message()
    }
}

/// On-disk shape of one entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct CacheRecord {
    pub token: String,
    pub version: String,
    pub sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl CacheRecord {
    pub fn from_entry(key: &CacheKey, entry: &CacheEntry) -> Self {
        Self {
            token: key.identifier.clone(),
            version: key.version.clone(),
            sha256: entry.digest.as_str().to_string(),
            error: entry.error().map(str::to_string),
            resolved_at: entry.resolved_at,
        }
    }

    pub fn into_entry(self) -> (CacheKey, CacheEntry) {
        let digest = match Digest::from(self.sha256) {
            Digest::Failed(_) => Digest::Failed(self.error.unwrap_or_default()),
            other => other,
        };
        (
            CacheKey::new(self.token, self.version),
            CacheEntry {
                digest,
                resolved_at: self.resolved_at,
            },
        )
    }
}
