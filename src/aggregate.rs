//! Single consumer that folds worker results back into the catalog

use crate::cache::{CacheKey, ResolutionCache};
use crate::catalog::Catalog;
use crate::resolver::{Origin, ResolutionResult};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::collections::HashMap;

/// Counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// Casks in the catalog
    pub total: usize,
    /// Casks whose digest was `no_check` when the run started
    pub pending: usize,
    /// Descriptors handed to the pool
    pub submitted: usize,
    /// Results received from the pool
    pub received: usize,
    /// Digests already present upstream
    pub upstream: usize,
    /// Served from the cache (including sticky failures)
    pub cached: usize,
    /// Freshly resolved by the oracle
    pub resolved: usize,
    /// Oracle failures in this run
    pub failed: usize,
    /// Oracle failures that were deadline expiries
    pub timed_out: usize,
    /// Cached failures served without retrying
    pub sticky: usize,
    /// Floating versions whose digest moved
    pub changed: usize,
    /// Cache entries written by the merge
    pub cache_updates: usize,
    /// Submission stopped early on shutdown
    pub interrupted: bool,
}

impl RunReport {
    /// Descriptors still `no_check` because they were never submitted
    pub fn skipped(&self) -> usize {
        self.pending.saturating_sub(self.submitted)
    }
}

/// Collects results keyed by `(token, version)`; a later result for a key wins
#[derive(Debug, Default)]
pub struct Aggregator {
    results: HashMap<CacheKey, ResolutionResult>,
    report: RunReport,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count and keep one result
    pub fn record(&mut self, result: ResolutionResult) {
        self.report.received += 1;
        match result.origin {
            // Upstream digests are counted from the catalog in `finish`
            Origin::Upstream => {}
            Origin::Cache => {
                self.report.cached += 1;
                if result.digest.is_failed() {
                    self.report.sticky += 1;
                }
            }
            Origin::Oracle if result.is_failure() => {
                self.report.failed += 1;
                if result.timed_out {
                    self.report.timed_out += 1;
                }
            }
            Origin::Oracle => {
                self.report.resolved += 1;
                if result.changed {
                    self.report.changed += 1;
                }
            }
        }
        self.results.insert(result.key(), result);
    }

    /// Drain a result stream until it ends, calling `observe` for each result
    pub async fn drain<S>(&mut self, results: S, mut observe: impl FnMut(&ResolutionResult))
    where
        S: Stream<Item = ResolutionResult>,
    {
        futures_util::pin_mut!(results);
        while let Some(result) = results.next().await {
            observe(&result);
            self.record(result);
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Sort the catalog, write digests back and merge fresh results into the cache
    ///
    /// Results are matched by token and version, so several versions of one
    /// token each receive their own digest.
    pub fn finish(self, catalog: &mut Catalog, cache: &mut ResolutionCache) -> RunReport {
        let mut report = self.report;
        report.total = catalog.len();
        report.pending = catalog.pending().count();
        report.upstream = report.total - report.pending;

        catalog.sort_by_identifier();
        for descriptor in catalog.iter_mut() {
            if let Some(result) = self.results.get(&CacheKey::of(descriptor)) {
                result.apply_to(descriptor);
            }
        }

        report.cache_updates = cache.merge(self.results.values());
        report
    }
}
