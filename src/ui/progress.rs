//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::resolver::{Origin, ResolutionResult};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.stop(message),
            None => println!("{} {}", style("[OK]").green(), message),
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        match self.spinner.take() {
            Some(spinner) => spinner.error(message),
            None => println!("{} {}", style("[FAIL]").red(), message),
        }
    }
}

/// Progress bar fed by the aggregator while results drain.
///
/// Draws an indicatif bar in interactive mode; in CI it stays silent apart
/// from one line per oracle failure.
pub struct ResolveProgress {
    bar: Option<ProgressBar>,
}

impl ResolveProgress {
    /// `total` is the number of descriptors that will be submitted
    pub fn new(ctx: &UiContext, total: u64) -> Self {
        let bar = ctx.use_fancy_output().then(|| {
            let bar = ProgressBar::new(total);
            let template = ProgressStyle::default_bar()
                .template(concat!(
                    "  {spinner:.cyan} Resolving  {bar:30.cyan/dim} ",
                    "{pos}/{len} {msg:.dim}  {elapsed:.dim}"
                ))
                .unwrap_or_else(|_| ProgressStyle::default_bar());
            bar.set_style(
                template
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
            bar.enable_steady_tick(Duration::from_millis(120));
            bar
        });
        Self { bar }
    }

    /// Record one result
    pub fn on_result(&self, result: &ResolutionResult) {
        let failure = (result.origin == Origin::Oracle)
            .then_some(result.error.as_deref())
            .flatten();

        match (&self.bar, failure) {
            (Some(bar), Some(error)) => {
                bar.println(format!(
                    "  {} {}@{}: {}",
                    style("✗").red(),
                    result.identifier,
                    result.version,
                    style(error).dim()
                ));
                bar.inc(1);
            }
            (Some(bar), None) => {
                bar.set_message(result.identifier.clone());
                bar.inc(1);
            }
            (None, Some(error)) => {
                println!(
                    "  {} {}@{}: {}",
                    style("[FAIL]").red(),
                    result.identifier,
                    result.version,
                    error
                );
            }
            (None, None) => {}
        }
    }

    /// Finish and clear the progress bar
    pub fn finish(&self) {
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}
