//! CLI argument definitions using clap derive

use crate::resolver::FailurePolicy;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Caskhash - fill in missing cask digests
///
/// Resolves the sha256 of every cask whose catalog entry says `no_check`,
/// reusing a persistent cache and running the digest oracle concurrently.
#[derive(Parser, Debug)]
#[command(name = "caskhash")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "CASKHASH_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve missing digests and write the catalog artifact
    Resolve(ResolveArgs),

    /// Inspect or edit the resolution cache
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Catalog URL or file path (defaults to catalog.source)
    pub source: Option<String>,

    /// Cache file (defaults to cache.path)
    #[arg(long)]
    pub cache: Option<PathBuf>,

    /// Output artifact (defaults to output.path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Number of concurrent oracle calls
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Per-call oracle timeout in seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// What to do with oracle failures
    #[arg(long)]
    pub policy: Option<FailurePolicy>,

    /// Drop cached failures before resolving
    #[arg(long)]
    pub retry_failed: bool,

    /// Show what would be resolved without calling the oracle or writing files
    #[arg(long)]
    pub dry_run: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
    /// Simple text (one per line)
    Plain,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Cache file (defaults to cache.path)
    #[arg(long, global = true)]
    pub file: Option<PathBuf>,

    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// List cached digests
    List {
        /// Only show cached failures
        #[arg(long)]
        failed: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Remove the entries of one cask
    #[command(disable_version_flag = true)]
    Forget {
        /// Cask token
        token: String,

        /// Only this version
        #[arg(long)]
        version: Option<String>,
    },

    /// Remove every cached failure
    Prune,
}
