//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (nothing shows until `start`)
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
            // Plain output for CI
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Progress bar counting down a cart's pending line writes.
///
/// Shows an indicatif bar in interactive mode and nothing in CI.
pub struct SyncProgress {
    bar: Option<ProgressBar>,
    total: u64,
}

impl SyncProgress {
    pub fn new(ctx: &UiContext, pending: usize) -> Self {
        let total = pending as u64;
        let bar = if ctx.use_fancy_output() && total > 0 {
            let bar = ProgressBar::new(total);
            if let Ok(template) = ProgressStyle::default_bar()
                .template("  {spinner:.cyan} Syncing  {bar:20.cyan/dim} {pos}/{len} {msg:.dim}  {elapsed:.dim}")
            {
                bar.set_style(
                    template
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .progress_chars("━╸─"),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(120));
            Some(bar)
        } else {
            None
        };
        Self { bar, total }
    }

    /// Record how many lines still have writes pending
    pub fn update(&mut self, pending: usize) {
        let pending = pending as u64;
        // A line may be re-dirtied while others finish
        if pending > self.total {
            self.total = pending;
        }
        if let Some(ref bar) = self.bar {
            bar.set_length(self.total);
            bar.set_position(self.total - pending);
            bar.set_message(format!("{} pending", pending));
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
