//! Configuration schema for Caskhash
//!
//! Configuration is stored at `~/.config/caskhash/config.toml`

use crate::pool::DEFAULT_WORKERS;
use crate::resolver::{FailurePolicy, DEFAULT_ORACLE_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Catalog location
    pub catalog: CatalogConfig,

    /// Worker pool and failure handling
    pub resolver: ResolverConfig,

    /// Digest oracle command
    pub oracle: OracleConfig,

    /// Resolution cache file
    pub cache: CacheConfig,

    /// Output artifact
    pub output: OutputConfig,
}

impl Config {
    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<(), String> {
        if self.resolver.timeout_secs == 0 {
            return Err("resolver.timeout_secs must be greater than 0".to_string());
        }
        if self.oracle.program.trim().is_empty() {
            return Err("oracle.program must not be empty".to_string());
        }
        if !matches!(self.general.log_format.as_str(), "text" | "json") {
            return Err(format!(
                "general.log_format must be \"text\" or \"json\", got \"{}\"",
                self.general.log_format
            ));
        }
        Ok(())
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Catalog settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// URL or path of the cask catalog, used when none is given on the command line
    pub source: Option<String>,
}

/// Resolver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Concurrent oracle invocations
    pub workers: usize,

    /// Deadline for one oracle call, in seconds
    pub timeout_secs: u64,

    /// "retry" leaves failures as no_check; "sticky" caches them as error
    pub failure_policy: FailurePolicy,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout_secs: DEFAULT_ORACLE_TIMEOUT.as_secs(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

/// Oracle command settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Program printing the digest of the URL passed as its last argument
    pub program: String,

    /// Arguments placed before the URL
    pub args: Vec<String>,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            program: "nix-prefetch-url".to_string(),
            args: vec![],
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache file path
    pub path: PathBuf,

    /// Fail instead of starting empty when the cache file is missing
    pub require_existing: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cask-cache.json"),
            require_existing: false,
        }
    }
}

/// Output settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Where the resolved catalog is written
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("cask.json"),
        }
    }
}
