//! Resolve command - fill in missing digests and write the artifact

use crate::cache::ResolutionCache;
use crate::catalog::{Catalog, CatalogSource};
use crate::cli::args::ResolveArgs;
use crate::config::Config;
use crate::error::{CaskhashError, CaskhashResult};
use crate::oracle::PrefetchOracle;
use crate::persist;
use crate::pipeline::{Pipeline, PipelineOptions, Plan};
use crate::resolver::ResolverOptions;
use crate::ui::{self, ResolveProgress, TaskSpinner, UiContext};
use console::style;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Effective settings after applying CLI overrides to the config
#[derive(Debug, Clone)]
struct Settings {
    source: CatalogSource,
    cache_path: PathBuf,
    output_path: PathBuf,
    require_cache: bool,
    options: PipelineOptions,
}

impl Settings {
    fn merge(args: &ResolveArgs, config: &Config) -> CaskhashResult<Self> {
        let locator = args
            .source
            .as_deref()
            .or(config.catalog.source.as_deref())
            .ok_or(CaskhashError::CatalogSourceMissing)?;

        let cache_path = args.cache.clone().unwrap_or_else(|| config.cache.path.clone());
        let output_path = args.output.clone().unwrap_or_else(|| config.output.path.clone());
        if persist::same_target(&output_path, &cache_path) {
            return Err(CaskhashError::OutputIsCache(output_path));
        }

        Ok(Self {
            source: CatalogSource::parse(locator),
            cache_path,
            output_path,
            require_cache: config.cache.require_existing,
            options: PipelineOptions {
                workers: args.workers.unwrap_or(config.resolver.workers),
                resolver: ResolverOptions {
                    timeout: Duration::from_secs(
                        args.timeout.unwrap_or(config.resolver.timeout_secs),
                    ),
                    policy: args.policy.unwrap_or(config.resolver.failure_policy),
                },
            },
        })
    }
}

/// Execute the resolve command
pub async fn execute(args: ResolveArgs, config: &Config) -> CaskhashResult<()> {
    let ctx = UiContext::detect();
    let settings = Settings::merge(&args, config)?;

    ui::intro(&ctx, "caskhash resolve");

    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Loading catalog from {}", settings.source));
    let catalog = match Catalog::load(&settings.source).await {
        Ok(catalog) => catalog,
        Err(e) => {
            spinner.stop_error("Could not load catalog");
            return Err(e);
        }
    };
    spinner.stop(&format!("Loaded {} casks", catalog.len()));

    let mut cache = ResolutionCache::load(&settings.cache_path, settings.require_cache).await?;
    if args.retry_failed {
        let dropped = cache.prune_failures();
        if dropped > 0 {
            ui::step_info(&ctx, &format!("Retrying {} cached failures", dropped));
        }
    }

    let plan = Pipeline::plan(&catalog, &cache);
    show_plan(&ctx, &plan, &settings);

    if args.dry_run {
        ui::outro_success(&ctx, "Dry run, nothing written");
        return Ok(());
    }

    let pipeline = Pipeline::new(
        Arc::new(PrefetchOracle::from_config(&config.oracle)),
        settings.options,
    );
    let progress = ResolveProgress::new(&ctx, (plan.total - plan.upstream) as u64);

    let output = pipeline
        .run_until(catalog, cache, ctrl_c(), |result| progress.on_result(result))
        .await;
    progress.finish();
    let output = output?;

    output
        .persist(&settings.output_path, &settings.cache_path)
        .await?;

    let report = &output.report;
    info!(
        "Run finished: {} resolved, {} cached, {} failed, {} changed",
        report.resolved, report.cached, report.failed, report.changed
    );

    ui::section(&ctx, "Summary");
    ui::key_value(&ctx, "resolved", report.resolved);
    ui::key_value(&ctx, "from cache", report.cached);
    ui::key_value(&ctx, "failed", report.failed);
    if report.timed_out > 0 {
        ui::key_value(&ctx, "timed out", report.timed_out);
    }
    ui::key_value(&ctx, "changed", report.changed);
    ui::step_ok_detail(
        &ctx,
        "Wrote artifact",
        &settings.output_path.display().to_string(),
    );
    ui::step_ok_detail(
        &ctx,
        &format!("Cache holds {} entries", output.cache.len()),
        &settings.cache_path.display().to_string(),
    );

    if report.failed > 0 || report.sticky > 0 {
        ui::step_warn_hint(
            &ctx,
            &format!("{} casks without a digest", report.failed + report.sticky),
            "caskhash cache list --failed",
        );
    }

    if report.interrupted {
        ui::outro_warn(
            &ctx,
            &format!(
                "Interrupted: {} casks left as no_check, rerun to finish",
                report.skipped()
            ),
        );
    } else {
        ui::outro_success(&ctx, "Done");
    }

    Ok(())
}

fn show_plan(ctx: &UiContext, plan: &Plan, settings: &Settings) {
    ui::section(ctx, "Plan");
    ui::key_value(ctx, "casks", plan.total);
    ui::key_value(ctx, "upstream", plan.upstream);
    ui::key_value(ctx, "cached", plan.cached);
    if plan.sticky > 0 {
        ui::key_value(ctx, "sticky", plan.sticky);
    }
    ui::key_value(ctx, "to fetch", plan.fetch);
    ui::key_value(ctx, "workers", settings.options.workers.max(1));
    ui::remark(
        ctx,
        &format!(
            "timeout {}s, failure policy {:?}",
            settings.options.resolver.timeout.as_secs(),
            settings.options.resolver.policy
        ),
    );
}

/// Exit status for a forced stop, as a shell reports SIGINT
const FORCED_EXIT_CODE: i32 = 130;

/// Resolves on the first Ctrl-C; never resolves if the handler cannot be installed
///
/// A second Ctrl-C exits immediately without persisting; in-flight oracle
/// children are killed with the process.
async fn ctrl_c() {
    interrupt_then_force(tokio::signal::ctrl_c(), tokio::signal::ctrl_c(), || {
        eprintln!("{} nothing was written", style("Aborted:").red().bold());
        std::process::exit(FORCED_EXIT_CODE);
    })
    .await
}

/// Resolves when `first` fires, then arms `force` to run if `second` fires too
async fn interrupt_then_force<A, B, F>(first: A, second: B, force: F)
where
    A: Future<Output = std::io::Result<()>>,
    B: Future<Output = std::io::Result<()>> + Send + 'static,
    F: FnOnce() + Send + 'static,
{
    if let Err(e) = first.await {
        warn!("Cannot listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }

    eprintln!(
        "{} finishing in-flight casks, press Ctrl-C again to abort without saving",
        style("Interrupted:").yellow()
    );
    tokio::spawn(async move {
        if second.await.is_ok() {
            force();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::FailurePolicy;
    use tokio::sync::oneshot;

    fn args(source: Option<&str>) -> ResolveArgs {
        ResolveArgs {
            source: source.map(str::to_string),
            cache: None,
            output: None,
            workers: None,
            timeout: None,
            policy: None,
            retry_failed: false,
            dry_run: false,
        }
    }

    #[test]
    fn settings_fall_back_to_config() {
        let mut config = Config::default();
        config.catalog.source = Some("https://example.com/cask.json".to_string());
        config.resolver.workers = 7;

        let settings = Settings::merge(&args(None), &config).unwrap();
        assert_eq!(
            settings.source,
            CatalogSource::Url("https://example.com/cask.json".to_string())
        );
        assert_eq!(settings.options.workers, 7);
        assert_eq!(settings.output_path, PathBuf::from("cask.json"));
        assert_eq!(settings.options.resolver.policy, FailurePolicy::Retry);
    }

    #[test]
    fn cli_flags_override_config() {
        let config = Config::default();
        let mut args = args(Some("local.json"));
        args.workers = Some(3);
        args.timeout = Some(5);
        args.policy = Some(FailurePolicy::Sticky);
        args.cache = Some(PathBuf::from("c.json"));

        let settings = Settings::merge(&args, &config).unwrap();
        assert_eq!(settings.source, CatalogSource::File(PathBuf::from("local.json")));
        assert_eq!(settings.options.workers, 3);
        assert_eq!(settings.options.resolver.timeout, Duration::from_secs(5));
        assert_eq!(settings.options.resolver.policy, FailurePolicy::Sticky);
        assert_eq!(settings.cache_path, PathBuf::from("c.json"));
    }

    #[test]
    fn shared_output_and_cache_file_is_rejected() {
        let mut args = args(Some("catalog.json"));
        args.output = Some(PathBuf::from("cask.json"));
        args.cache = Some(PathBuf::from("./cask.json"));

        let err = Settings::merge(&args, &Config::default()).unwrap_err();
        assert!(matches!(err, CaskhashError::OutputIsCache(_)));
        assert!(err.hint().is_some());
    }

    #[test]
    fn missing_source_is_an_error() {
        let err = Settings::merge(&args(None), &Config::default()).unwrap_err();
        assert!(matches!(err, CaskhashError::CatalogSourceMissing));
    }

    #[tokio::test]
    async fn second_interrupt_forces_exit() {
        let (second_tx, second_rx) = oneshot::channel::<()>();
        let (forced_tx, forced_rx) = oneshot::channel();

        interrupt_then_force(
            std::future::ready(Ok(())),
            async move { second_rx.await.map_err(std::io::Error::other) },
            move || {
                let _ = forced_tx.send(());
            },
        )
        .await;

        second_tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), forced_rx)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn single_interrupt_only_stops_submission() {
        let (second_tx, second_rx) = oneshot::channel::<()>();
        let (forced_tx, forced_rx) = oneshot::channel::<()>();

        interrupt_then_force(
            std::future::ready(Ok(())),
            async move { second_rx.await.map_err(std::io::Error::other) },
            move || {
                let _ = forced_tx.send(());
            },
        )
        .await;

        // The listener ends without a second signal, so the exit hook is dropped
        drop(second_tx);
        assert!(forced_rx.await.is_err());
    }
}
