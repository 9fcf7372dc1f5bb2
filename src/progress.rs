//! Terminal progress for batch runs.
//!
//! [`TerminalProgress`] draws an indicatif bar and prints one status line
//! per organization above it. It also remembers failures so they can be
//! listed again after the bar is gone.

use batchkit::{BatchResult, Disposition, ExecutionMode, OperationError, ProgressCallback};
use codesec::ErrorCategory;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const BAR_TEMPLATE: &str = "{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}";

pub struct TerminalProgress {
    bar: Option<ProgressBar>,
    quiet: bool,
    failures: Vec<(String, String)>,
    abort_advice: Option<&'static str>,
}

impl TerminalProgress {
    pub fn new(quiet: bool) -> Self {
        Self {
            bar: None,
            quiet,
            failures: Vec::new(),
            abort_advice: None,
        }
    }

    /// Organizations that ended in an error, with the error text
    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    /// What to do about the error that stopped the batch, if it stopped
    pub fn abort_advice(&self) -> Option<&'static str> {
        self.abort_advice
    }

    fn line(&self, line: String) {
        match &self.bar {
            Some(bar) => bar.println(line),
            None => println!("{line}"),
        }
    }
}

fn bar_style() -> ProgressStyle {
    match ProgressStyle::default_bar().template(BAR_TEMPLATE) {
        Ok(style) => style.progress_chars("=>-"),
        Err(_) => ProgressStyle::default_bar(),
    }
}

/// Remediation for a batch-stopping error, from its API error category
fn advice_for(error: &OperationError) -> &'static str {
    error
        .inner()
        .downcast_ref::<codesec::Error>()
        .map_or(ErrorCategory::Unavailable, codesec::Error::category)
        .advice()
}

impl ProgressCallback for TerminalProgress {
    fn on_batch_start(&mut self, total: usize, mode: ExecutionMode) {
        let bar = ProgressBar::new(total as u64);
        if self.quiet {
            bar.set_draw_target(ProgressDrawTarget::hidden());
        }
        bar.set_style(bar_style());
        bar.set_message(mode.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));
        self.bar = Some(bar);
    }

    fn on_wait(&mut self, delay: Duration) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("waiting {}s", delay.as_secs()));
        }
    }

    fn on_target_start(&mut self, target: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(target.to_string());
        }
    }

    fn on_target_complete(&mut self, target: &str, disposition: Disposition<'_>) {
        match disposition {
            Disposition::Succeeded => {
                if !self.quiet {
                    self.line(format!("  {} {}", "✓".green(), target));
                }
            }
            Disposition::Skipped(reason) => {
                if !self.quiet {
                    self.line(format!("  {} {} ({})", "⊘".yellow(), target, reason.dimmed()));
                }
            }
            Disposition::Excused(err) => {
                if !self.quiet {
                    self.line(format!("  {} {} ({})", "⊘".yellow(), target, err.to_string().dimmed()));
                }
            }
            Disposition::Failed(err) | Disposition::Fatal(err) => {
                self.line(format!("  {} {}: {}", "✗".red(), target, err));
                self.failures.push((target.to_string(), err.to_string()));
            }
        }
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    fn on_abort(&mut self, target: &str, error: &OperationError) {
        self.line(format!(
            "  {} Stopping: '{}' failed in a way every organization will ({})",
            "✗".red().bold(),
            target,
            error
        ));
        let advice = advice_for(error);
        self.line(format!("    {} {}", "→".cyan(), advice));
        self.abort_advice = Some(advice);
    }

    fn on_skip_remaining(&mut self, count: usize) {
        if let Some(bar) = &self.bar {
            bar.inc(count as u64);
        }
        self.line(format!(
            "  {} {} organizations not processed, counted as skipped",
            "⊘".yellow(),
            count
        ));
    }

    fn on_batch_complete(&mut self, _result: &BatchResult) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}
