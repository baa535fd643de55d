//! Digest oracle abstraction
//!
//! The oracle downloads an artifact and reports its content digest. The
//! default implementation shells out to `nix-prefetch-url`; tests plug in
//! in-process fakes.

mod prefetch;

pub use prefetch::PrefetchOracle;

use crate::error::OracleError;
use async_trait::async_trait;

/// Computes the digest of the artifact at a URL
///
/// Implementations need not enforce a deadline; the resolver wraps every
/// call in its own timeout and drops the future when it elapses.
#[async_trait]
pub trait DigestOracle: Send + Sync {
    /// Compute the digest for `url`; surrounding whitespace is trimmed by the caller
    async fn compute_digest(&self, url: &str) -> Result<String, OracleError>;

    /// Short name for logs and error messages
    fn name(&self) -> &str;
}
