//! Caskhash - concurrent digest resolution for Homebrew cask catalogs
//!
//! Loads a cask catalog, fills in every `no_check` digest through a bounded
//! pool of oracle workers backed by a persistent `(token, version)` cache,
//! and writes a sorted catalog artifact once all results are in.

pub mod aggregate;
pub mod cache;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod oracle;
pub mod persist;
pub mod pipeline;
pub mod pool;
pub mod resolver;
pub mod ui;

pub use error::{CaskhashError, CaskhashResult};
