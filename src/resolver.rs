//! Hash resolution for a single descriptor
//!
//! [`decide`] is the pure cache policy; [`Resolver::resolve`] carries out its
//! decision and returns a [`ResolutionResult`] without touching shared state.

use crate::cache::{CacheEntry, CacheKey, ResolutionCache};
use crate::catalog::{Descriptor, Digest, Version};
use crate::error::OracleError;
use crate::oracle::DigestOracle;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default deadline for one oracle call
pub const DEFAULT_ORACLE_TIMEOUT: Duration = Duration::from_secs(60);

/// What a failed oracle call turns into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Leave the digest as `no_check`, cache nothing, try again next run
    #[default]
    Retry,
    /// Mark the digest `error` and cache the failure until it is cleared
    Sticky,
}

/// Outcome of consulting the cache
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Digest already present in the catalog
    Upstream,
    /// Reuse the cached entry without calling the oracle
    Cached(CacheEntry),
    /// Ask the oracle; `cached` is the previous digest for a floating version
    Fetch { cached: Option<String> },
}

/// Where a result's digest came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Upstream,
    Cache,
    Oracle,
}

/// Resolution outcome for one descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct ResolutionResult {
    pub identifier: String,
    pub version: Version,
    pub digest: Digest,
    /// Oracle or cached diagnostic when resolution failed
    pub error: Option<String>,
    pub origin: Origin,
    /// The oracle reported a digest different from the cached one
    pub changed: bool,
    /// The oracle call hit its deadline
    pub timed_out: bool,
}

impl ResolutionResult {
    fn new(descriptor: &Descriptor, digest: Digest, error: Option<String>, origin: Origin) -> Self {
        Self {
            identifier: descriptor.identifier.clone(),
            version: descriptor.version.clone(),
            digest,
            error,
            origin,
            changed: false,
            timed_out: false,
        }
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.identifier.as_str(), self.version.as_str())
    }

    pub fn is_failure(&self) -> bool {
        self.error.is_some()
    }

    /// Write the digest back onto the descriptor it came from
    pub fn apply_to(&self, descriptor: &mut Descriptor) {
        descriptor.digest = self.digest.clone();
    }
}

/// Cache policy for one descriptor
///
/// Pinned versions and sticky failures are served from the cache; a floating
/// version is always re-fetched so upstream republishing is noticed.
pub fn decide(descriptor: &Descriptor, cache: &ResolutionCache) -> Decision {
    if !descriptor.needs_resolution() {
        return Decision::Upstream;
    }

    match cache.lookup(descriptor) {
        Some(entry) if entry.is_failure() || !descriptor.version.is_floating() => {
            Decision::Cached(entry.clone())
        }
        Some(entry) => Decision::Fetch {
            cached: entry.digest.as_resolved().map(str::to_string),
        },
        None => Decision::Fetch { cached: None },
    }
}

/// Tunables for [`Resolver`]
#[derive(Debug, Clone, Copy)]
pub struct ResolverOptions {
    pub timeout: Duration,
    pub policy: FailurePolicy,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_ORACLE_TIMEOUT,
            policy: FailurePolicy::default(),
        }
    }
}

/// Resolves descriptors against a cache snapshot and an oracle
pub struct Resolver {
    cache: Arc<ResolutionCache>,
    oracle: Arc<dyn DigestOracle>,
    options: ResolverOptions,
}

impl Resolver {
    pub fn new(
        cache: Arc<ResolutionCache>,
        oracle: Arc<dyn DigestOracle>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            cache,
            oracle,
            options,
        }
    }

    /// Resolve one descriptor. Never fails: oracle errors become result data.
    pub async fn resolve(&self, descriptor: &Descriptor) -> ResolutionResult {
        match decide(descriptor, &self.cache) {
            Decision::Upstream => ResolutionResult::new(
                descriptor,
                descriptor.digest.clone(),
                None,
                Origin::Upstream,
            ),
            Decision::Cached(entry) => {
                debug!(
                    "Cache hit for {}@{}: {}",
                    descriptor.identifier, descriptor.version, entry.digest
                );
                let error = entry.error().map(str::to_string);
                ResolutionResult::new(descriptor, entry.digest, error, Origin::Cache)
            }
            Decision::Fetch { cached } => self.fetch(descriptor, cached).await,
        }
    }

    async fn fetch(&self, descriptor: &Descriptor, cached: Option<String>) -> ResolutionResult {
        let call = self.oracle.compute_digest(&descriptor.source_url);
        let outcome = match tokio::time::timeout(self.options.timeout, call).await {
            Ok(outcome) => outcome,
            Err(_) => Err(OracleError::Timeout(self.options.timeout)),
        };

        let outcome = outcome.and_then(|raw| {
            let hash = raw.trim();
            if hash.is_empty() {
                Err(OracleError::EmptyOutput {
                    program: self.oracle.name().to_string(),
                })
            } else {
                Ok(hash.to_string())
            }
        });

        match outcome {
            Ok(hash) => {
                let changed = cached.as_deref().is_some_and(|previous| previous != hash);
                if changed {
                    info!(
                        "{} {} updated from {} to {}",
                        descriptor.identifier,
                        descriptor.version,
                        cached.as_deref().unwrap_or_default(),
                        hash
                    );
                } else {
                    debug!("Resolved {}@{}: {}", descriptor.identifier, descriptor.version, hash);
                }
                let mut result =
                    ResolutionResult::new(descriptor, Digest::Resolved(hash), None, Origin::Oracle);
                result.changed = changed;
                result
            }
            Err(e) => {
                warn!(
                    "Failed to resolve {}@{} ({}): {}",
                    descriptor.identifier, descriptor.version, descriptor.source_url, e
                );
                let message = e.to_string();
                let digest = match self.options.policy {
                    FailurePolicy::Retry => Digest::Unresolved,
                    FailurePolicy::Sticky => Digest::Failed(message.clone()),
                };
                let mut result =
                    ResolutionResult::new(descriptor, digest, Some(message), Origin::Oracle);
                result.timed_out = e.is_timeout();
                result
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Oracle answering from a fixed table; unknown URLs fail
    pub(crate) struct TableOracle {
        answers: HashMap<String, String>,
        pub calls: AtomicUsize,
    }

    impl TableOracle {
        pub(crate) fn new(answers: &[(&str, &str)]) -> Self {
            Self {
                answers: answers
                    .iter()
                    .map(|(url, hash)| (url.to_string(), hash.to_string()))
                    .collect(),
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DigestOracle for TableOracle {
        async fn compute_digest(&self, url: &str) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answers
                .get(url)
                .cloned()
                .ok_or_else(|| OracleError::Exit {
                    program: "table".to_string(),
                    status: "exit status: 1".to_string(),
                    stderr: format!("no answer for {url}"),
                })
        }

        fn name(&self) -> &str {
            "table"
        }
    }

    /// Oracle that must never be consulted
    struct ForbiddenOracle;

    #[async_trait]
    impl DigestOracle for ForbiddenOracle {
        async fn compute_digest(&self, url: &str) -> Result<String, OracleError> {
            panic!("oracle called for {url}");
        }

        fn name(&self) -> &str {
            "forbidden"
        }
    }

    /// Oracle that never answers in time
    struct SlowOracle;

    #[async_trait]
    impl DigestOracle for SlowOracle {
        async fn compute_digest(&self, _url: &str) -> Result<String, OracleError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("late".to_string())
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    fn cache_with(entries: &[(&str, &str, CacheEntry)]) -> Arc<ResolutionCache> {
        let mut cache = ResolutionCache::new();
        for (id, version, entry) in entries {
            cache.insert(CacheKey::new(*id, *version), entry.clone());
        }
        Arc::new(cache)
    }

    fn resolver(cache: Arc<ResolutionCache>, oracle: Arc<dyn DigestOracle>) -> Resolver {
        Resolver::new(cache, oracle, ResolverOptions::default())
    }

    fn pending(id: &str, version: &str, url: &str) -> Descriptor {
        Descriptor::new(id, version, url, Digest::Unresolved)
    }

    #[test]
    fn decide_upstream_digest() {
        let descriptor = Descriptor::new("foo", "1.0", "u", Digest::Resolved("up".to_string()));
        assert_eq!(decide(&descriptor, &ResolutionCache::new()), Decision::Upstream);
    }

    #[test]
    fn decide_floating_refetches_with_previous() {
        let cache = cache_with(&[("foo", "latest", CacheEntry::resolved("old"))]);
        assert_eq!(
            decide(&pending("foo", "latest", "u"), &cache),
            Decision::Fetch {
                cached: Some("old".to_string())
            }
        );
    }

    #[test]
    fn decide_miss() {
        assert_eq!(
            decide(&pending("foo", "1.0", "u"), &ResolutionCache::new()),
            Decision::Fetch { cached: None }
        );
    }

    #[tokio::test]
    async fn pinned_cache_hit_skips_oracle() {
        let cache = cache_with(&[("foo", "1.2.0", CacheEntry::resolved("abc"))]);
        let resolver = resolver(cache, Arc::new(ForbiddenOracle));

        let result = resolver.resolve(&pending("foo", "1.2.0", "u1")).await;

        assert_eq!(result.digest, Digest::Resolved("abc".to_string()));
        assert_eq!(result.origin, Origin::Cache);
        assert!(!result.is_failure());
    }

    #[tokio::test]
    async fn floating_version_is_rechecked() {
        let cache = cache_with(&[("foo", "latest", CacheEntry::resolved("old"))]);
        let oracle = Arc::new(TableOracle::new(&[("u1", "new\n")]));
        let resolver = resolver(cache, oracle.clone());

        let result = resolver.resolve(&pending("foo", "latest", "u1")).await;

        assert_eq!(oracle.calls(), 1);
        assert_eq!(result.digest, Digest::Resolved("new".to_string()));
        assert_eq!(result.origin, Origin::Oracle);
        assert!(result.changed);
    }

    #[tokio::test]
    async fn floating_version_unchanged_digest() {
        let cache = cache_with(&[("foo", "latest", CacheEntry::resolved("same"))]);
        let oracle = Arc::new(TableOracle::new(&[("u1", "same")]));
        let result = resolver(cache, oracle).resolve(&pending("foo", "latest", "u1")).await;
        assert!(!result.changed);
    }

    #[tokio::test]
    async fn sticky_failure_is_returned_for_any_version() {
        let cache = cache_with(&[
            ("foo", "1.0", CacheEntry::failed("HTTP 404")),
            ("bar", "latest", CacheEntry::failed("HTTP 500")),
        ]);
        let resolver = resolver(cache, Arc::new(ForbiddenOracle));

        let pinned = resolver.resolve(&pending("foo", "1.0", "u1")).await;
        assert!(pinned.digest.is_failed());
        assert_eq!(pinned.error.as_deref(), Some("HTTP 404"));

        let floating = resolver.resolve(&pending("bar", "latest", "u2")).await;
        assert!(floating.digest.is_failed());
        assert_eq!(floating.origin, Origin::Cache);
    }

    #[tokio::test]
    async fn upstream_digest_returned_unchanged() {
        let resolver = resolver(Arc::new(ResolutionCache::new()), Arc::new(ForbiddenOracle));
        let descriptor = Descriptor::new("foo", "1.0", "u", Digest::Resolved("up".to_string()));

        let result = resolver.resolve(&descriptor).await;
        assert_eq!(result.digest, Digest::Resolved("up".to_string()));
        assert_eq!(result.origin, Origin::Upstream);
    }

    #[tokio::test]
    async fn retry_policy_leaves_unresolved() {
        let oracle = Arc::new(TableOracle::new(&[]));
        let result = resolver(Arc::new(ResolutionCache::new()), oracle)
            .resolve(&pending("foo", "1.0", "missing"))
            .await;

        assert_eq!(result.digest, Digest::Unresolved);
        assert!(result.error.as_deref().unwrap().contains("no answer for missing"));
    }

    #[tokio::test]
    async fn sticky_policy_marks_failed() {
        let resolver = Resolver::new(
            Arc::new(ResolutionCache::new()),
            Arc::new(TableOracle::new(&[])),
            ResolverOptions {
                policy: FailurePolicy::Sticky,
                ..ResolverOptions::default()
            },
        );
        let result = resolver.resolve(&pending("foo", "1.0", "missing")).await;

        assert!(result.digest.is_failed());
        assert_eq!(result.digest.failure_message(), result.error.as_deref());
    }

    #[tokio::test]
    async fn timeout_is_a_failure() {
        let resolver = Resolver::new(
            Arc::new(ResolutionCache::new()),
            Arc::new(SlowOracle),
            ResolverOptions {
                timeout: Duration::from_millis(20),
                policy: FailurePolicy::Sticky,
            },
        );
        let result = resolver.resolve(&pending("foo", "1.0", "u")).await;

        assert!(result.digest.is_failed());
        assert!(result.timed_out);
        assert!(result.error.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn blank_output_is_a_failure() {
        let oracle = Arc::new(TableOracle::new(&[("u", "  \n")]));
        let result = resolver(Arc::new(ResolutionCache::new()), oracle)
            .resolve(&pending("foo", "1.0", "u"))
            .await;
        assert!(result.is_failure());
        assert_eq!(result.digest, Digest::Unresolved);
    }
}
