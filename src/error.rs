//! Error types for Caskhash
//!
//! Fatal errors use `CaskhashResult<T>`. Failures of a single oracle call are
//! `OracleError` values and never abort a run.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Caskhash operations
pub type CaskhashResult<T> = Result<T, CaskhashError>;

/// Errors that abort a run
#[derive(Error, Debug)]
pub enum CaskhashError {
    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No catalog source given")]
    CatalogSourceMissing,

    // Catalog errors
    #[error("Failed to fetch catalog {url}: {reason}")]
    CatalogFetch { url: String, reason: String },

    #[error("Malformed catalog {source_name}: {reason}")]
    CatalogMalformed { source_name: String, reason: String },

    // Cache errors
    #[error("Cache file not found: {0}")]
    CacheMissing(PathBuf),

    #[error("Malformed cache file {path}: {reason}")]
    CacheMalformed { path: PathBuf, reason: String },

    #[error("No cache entry for {0}")]
    CacheEntryNotFound(String),

    #[error("Output and cache both point at {0}")]
    OutputIsCache(PathBuf),

    // Pipeline errors
    #[error("Resolver worker panicked: {0}")]
    WorkerPanicked(String),

    #[error("Worker pool closed before all descriptors were submitted")]
    PoolClosed,

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CaskhashError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::CatalogSourceMissing => {
                Some("Pass a catalog URL or path: caskhash resolve <SOURCE>, or set catalog.source")
            }
            Self::CacheMissing(_) => {
                Some("Create an empty cache with: echo '[]' > <path>, or set cache.require_existing = false")
            }
            Self::CacheEntryNotFound(_) => Some("List cached entries with: caskhash cache list"),
            Self::OutputIsCache(_) => {
                Some("Use separate files, e.g. --output cask.json --cache cask-cache.json")
            }
            Self::ConfigInvalid { .. } => Some("Check the file with: caskhash config show"),
            _ => None,
        }
    }
}

/// Failure of a single oracle invocation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("failed to spawn {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("{program} exited with {status}: {stderr}")]
    Exit {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("{program} printed no digest")]
    EmptyOutput { program: String },
}

impl OracleError {
    /// Whether the failure came from the deadline rather than the oracle itself
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}
