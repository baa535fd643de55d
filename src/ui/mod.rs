//! UI module for consistent CLI output
//!
//! Uses `cliclack` for the interactive run summary and `indicatif` for the
//! resolve progress bar, with automatic fallback to plain output in CI and
//! when stdout is not a terminal.
//!
//! # Example
//!
//! ```rust,ignore
//! use caskhash::ui::{self, UiContext, TaskSpinner};
//!
//! let ctx = UiContext::detect();
//!
//! ui::intro(&ctx, "caskhash resolve");
//!
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Loading catalog...");
//! // ... do work ...
//! spinner.stop("Loaded 7203 casks");
//!
//! ui::step_warn_hint(&ctx, "12 casks failed", "caskhash cache list --failed");
//! ui::outro_success(&ctx, "Wrote cask.json");
//! ```

mod context;
mod output;
mod progress;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, remark, section, step_info, step_ok,
    step_ok_detail, step_warn, step_warn_hint,
};
pub use progress::{ResolveProgress, TaskSpinner};
