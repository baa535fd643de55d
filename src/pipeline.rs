//! End-to-end resolution run
//!
//! One producer feeds pending descriptors into the worker pool, the calling
//! task aggregates results, and the merged catalog and cache are returned for
//! a single persist once the pool has drained.

use crate::aggregate::{Aggregator, RunReport};
use crate::cache::ResolutionCache;
use crate::catalog::{Catalog, Descriptor};
use crate::error::{CaskhashError, CaskhashResult};
use crate::oracle::DigestOracle;
use crate::pool::{Submitter, WorkerPool, DEFAULT_WORKERS};
use crate::resolver::{decide, Decision, ResolutionResult, Resolver, ResolverOptions};
use serde::Serialize;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Pool and resolver settings for a run
#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    pub workers: usize,
    pub resolver: ResolverOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            resolver: ResolverOptions::default(),
        }
    }
}

/// What a run would do, computed without calling the oracle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub total: usize,
    pub upstream: usize,
    pub cached: usize,
    pub sticky: usize,
    pub fetch: usize,
}

/// Merged state after a run, ready to persist
#[derive(Debug)]
pub struct PipelineOutput {
    pub catalog: Catalog,
    pub cache: ResolutionCache,
    pub report: RunReport,
}

impl PipelineOutput {
    /// Write the artifact, then the cache. Called once per run.
    ///
    /// Refuses to write when both paths name the same file, since the cache
    /// would replace the artifact.
    pub async fn persist(&self, artifact_path: &Path, cache_path: &Path) -> CaskhashResult<()> {
        if crate::persist::same_target(artifact_path, cache_path) {
            return Err(CaskhashError::OutputIsCache(artifact_path.to_path_buf()));
        }
        let json = self.catalog.to_json_pretty()?;
        crate::persist::write_atomic(artifact_path, json.as_bytes()).await?;
        info!(
            "Wrote {} casks to {}",
            self.catalog.len(),
            artifact_path.display()
        );
        self.cache.persist(cache_path).await
    }
}

/// Resolution pipeline bound to one oracle
pub struct Pipeline {
    oracle: Arc<dyn DigestOracle>,
    options: PipelineOptions,
}

struct Produced {
    submitted: usize,
    interrupted: bool,
}

impl Pipeline {
    pub fn new(oracle: Arc<dyn DigestOracle>, options: PipelineOptions) -> Self {
        Self { oracle, options }
    }

    /// Classify every descriptor against the cache
    pub fn plan(catalog: &Catalog, cache: &ResolutionCache) -> Plan {
        let mut plan = Plan {
            total: catalog.len(),
            ..Plan::default()
        };
        for descriptor in catalog.iter() {
            match decide(descriptor, cache) {
                Decision::Upstream => plan.upstream += 1,
                Decision::Cached(entry) => {
                    plan.cached += 1;
                    if entry.is_failure() {
                        plan.sticky += 1;
                    }
                }
                Decision::Fetch { .. } => plan.fetch += 1,
            }
        }
        plan
    }

    /// Run to completion
    pub async fn run(
        &self,
        catalog: Catalog,
        cache: ResolutionCache,
    ) -> CaskhashResult<PipelineOutput> {
        self.run_until(catalog, cache, std::future::pending::<()>(), |_| {})
            .await
    }

    /// Run until done or until `shutdown` resolves
    ///
    /// On shutdown no further descriptors are submitted; queued and in-flight
    /// work still drains and is merged. Unsubmitted descriptors keep their
    /// `no_check` digest.
    pub async fn run_until<F>(
        &self,
        mut catalog: Catalog,
        cache: ResolutionCache,
        shutdown: F,
        observe: impl FnMut(&ResolutionResult),
    ) -> CaskhashResult<PipelineOutput>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let pending: Vec<Descriptor> = catalog.pending().cloned().collect();
        info!(
            "{} of {} casks need a digest, {} workers",
            pending.len(),
            catalog.len(),
            self.options.workers.max(1)
        );

        let snapshot = Arc::new(cache);
        let resolver = Arc::new(Resolver::new(
            Arc::clone(&snapshot),
            Arc::clone(&self.oracle),
            self.options.resolver,
        ));

        let mut pool = WorkerPool::start(self.options.workers, resolver);
        let submitter = pool.submitter().ok_or(CaskhashError::PoolClosed)?;
        pool.close();
        let results = pool.results();

        let producer = tokio::spawn(produce(submitter, pending, shutdown));

        let mut aggregator = Aggregator::new();
        aggregator.drain(results.into_stream(), observe).await;
        debug!("Result stream drained ({} results)", aggregator.len());

        pool.join().await?;
        let produced = producer
            .await
            .map_err(|e| CaskhashError::Internal(format!("producer task failed: {}", e)))??;

        let mut cache = Arc::try_unwrap(snapshot).unwrap_or_else(|shared| (*shared).clone());
        let mut report = aggregator.finish(&mut catalog, &mut cache);
        report.submitted = produced.submitted;
        report.interrupted = produced.interrupted;

        Ok(PipelineOutput {
            catalog,
            cache,
            report,
        })
    }
}

async fn produce<F>(
    submitter: Submitter,
    pending: Vec<Descriptor>,
    shutdown: F,
) -> CaskhashResult<Produced>
where
    F: Future<Output = ()> + Send,
{
    tokio::pin!(shutdown);
    let mut submitted = 0;

    for descriptor in pending {
        tokio::select! {
            biased;
            _ = &mut shutdown => {
                warn!(
                    "Shutdown requested, {} descriptors submitted; draining in-flight work",
                    submitted
                );
                return Ok(Produced { submitted, interrupted: true });
            }
            sent = submitter.submit(descriptor) => {
                sent?;
                submitted += 1;
            }
        }
    }

    Ok(Produced {
        submitted,
        interrupted: false,
    })
}
