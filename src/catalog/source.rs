//! Where a catalog comes from: an HTTP(S) endpoint or a local file

use crate::error::{CaskhashError, CaskhashResult};
use std::fmt;
use std::path::PathBuf;
use tokio::fs;
use tracing::debug;

/// Upper bound on a fetched catalog body (the full Homebrew cask API is ~30 MB)
const MAX_CATALOG_BYTES: u64 = 512 * 1024 * 1024;

/// Location of a catalog document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogSource {
    Url(String),
    File(PathBuf),
}

impl CatalogSource {
    /// Interpret a user-supplied locator
    pub fn parse(locator: &str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Self::Url(locator.to_string())
        } else {
            Self::File(PathBuf::from(locator))
        }
    }

    /// Read the raw catalog document
    pub async fn read(&self) -> CaskhashResult<String> {
        match self {
            Self::Url(url) => fetch(url).await,
            Self::File(path) => fs::read_to_string(path)
                .await
                .map_err(|e| CaskhashError::io(format!("reading catalog {}", path.display()), e)),
        }
    }
}

impl fmt::Display for CatalogSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{}", url),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Fetch a catalog over HTTP. Any non-2xx status is an error.
async fn fetch(url: &str) -> CaskhashResult<String> {
    debug!("Fetching catalog from {}", url);

    let owned = url.to_string();
    tokio::task::spawn_blocking(move || {
        let fetch_error = |reason: String| CaskhashError::CatalogFetch {
            url: owned.clone(),
            reason,
        };

        let mut response = ureq::get(&owned)
            .call()
            .map_err(|e| fetch_error(e.to_string()))?;

        response
            .body_mut()
            .with_config()
            .limit(MAX_CATALOG_BYTES)
            .read_to_string()
            .map_err(|e| fetch_error(e.to_string()))
    })
    .await
    .map_err(|e| CaskhashError::Internal(format!("catalog fetch task failed: {}", e)))?
}
