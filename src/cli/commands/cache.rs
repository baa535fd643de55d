//! Cache command - inspect and edit the resolution cache

use crate::cache::{CacheEntry, CacheKey, ResolutionCache};
use crate::cli::args::{CacheAction, CacheArgs, OutputFormat};
use crate::config::Config;
use crate::error::{CaskhashError, CaskhashResult};
use crate::ui::{self, UiContext};
use console::style;
use std::path::Path;
use tracing::debug;

/// Execute the cache command
pub async fn execute(args: CacheArgs, config: &Config) -> CaskhashResult<()> {
    let path = args.file.unwrap_or_else(|| config.cache.path.clone());
    let cache = ResolutionCache::load(&path, config.cache.require_existing).await?;
    debug!("Loaded {} cache entries from {}", cache.len(), path.display());

    match args.action {
        CacheAction::List { failed, format } => list_entries(&cache, failed, format),
        CacheAction::Forget { token, version } => {
            forget(cache, &path, &token, version.as_deref()).await
        }
        CacheAction::Prune => prune(cache, &path).await,
    }
}

/// List cached digests
fn list_entries(
    cache: &ResolutionCache,
    failed_only: bool,
    format: OutputFormat,
) -> CaskhashResult<()> {
    let entries: Vec<(&CacheKey, &CacheEntry)> = cache
        .sorted()
        .into_iter()
        .filter(|(_, entry)| !failed_only || entry.is_failure())
        .collect();

    match format {
        OutputFormat::Table => print_table(&entries),
        OutputFormat::Json => print_json(&entries)?,
        OutputFormat::Plain => print_plain(&entries),
    }

    Ok(())
}

fn print_table(entries: &[(&CacheKey, &CacheEntry)]) {
    if entries.is_empty() {
        println!("No cache entries found.");
        return;
    }

    println!(
        "{:<32} {:<16} {:<54} {:<16}",
        "TOKEN", "VERSION", "SHA256", "RESOLVED"
    );
    println!("{}", "-".repeat(120));

    for (key, entry) in entries {
        let digest = match entry.error() {
            Some(error) => style(format!("error: {}", truncate(error, 47))).red().to_string(),
            None if entry.is_failure() => style("error").red().to_string(),
            None => entry.digest.as_str().to_string(),
        };
        let resolved = entry
            .resolved_at
            .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{:<32} {:<16} {:<54} {:<16}",
            key.identifier, key.version, digest, resolved
        );
    }

    println!();
    println!("Total: {} entr{}", entries.len(), if entries.len() == 1 { "y" } else { "ies" });
}

fn print_json(entries: &[(&CacheKey, &CacheEntry)]) -> CaskhashResult<()> {
    #[derive(serde::Serialize)]
    struct EntryJson<'a> {
        token: &'a str,
        version: &'a str,
        sha256: &'a str,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<&'a str>,
        #[serde(skip_serializing_if = "Option::is_none")]
        resolved_at: Option<String>,
    }

    let json: Vec<EntryJson<'_>> = entries
        .iter()
        .map(|(key, entry)| EntryJson {
            token: &key.identifier,
            version: &key.version,
            sha256: entry.digest.as_str(),
            error: entry.error(),
            resolved_at: entry.resolved_at.map(|at| at.to_rfc3339()),
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

fn print_plain(entries: &[(&CacheKey, &CacheEntry)]) {
    for (key, entry) in entries {
        println!("{} {}", key, entry.digest.as_str());
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}

/// Remove every entry of a token, or just one version
async fn forget(
    mut cache: ResolutionCache,
    path: &Path,
    token: &str,
    version: Option<&str>,
) -> CaskhashResult<()> {
    let ctx = UiContext::detect();
    let removed = cache.remove(token, version);
    if removed == 0 {
        let target = match version {
            Some(version) => format!("{}@{}", token, version),
            None => token.to_string(),
        };
        return Err(CaskhashError::CacheEntryNotFound(target));
    }

    cache.persist(path).await?;
    let noun = if removed == 1 { "entry" } else { "entries" };
    ui::step_ok(&ctx, &format!("Removed {} {} for {}", removed, noun, token));
    Ok(())
}

/// Drop every cached failure so the next run retries them
async fn prune(mut cache: ResolutionCache, path: &Path) -> CaskhashResult<()> {
    let ctx = UiContext::detect();
    let removed = cache.prune_failures();
    if removed == 0 {
        ui::step_info(&ctx, "No cached failures to prune");
        return Ok(());
    }

    cache.persist(path).await?;
    ui::step_ok(&ctx, &format!("Pruned {} cached failures", removed));
    Ok(())
}
