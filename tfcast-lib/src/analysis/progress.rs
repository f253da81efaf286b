//! Progress reporting over the repositories of a run.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Receives progress as the orchestrator walks the repository list.
pub trait Progress {
    /// The number of repositories about to be processed.
    fn begin(&self, repositories: u64);

    /// Processing of `repository` has started.
    fn repository(&self, index: u64, repository: &str);

    fn finish(&self);
}

/// Discards all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    fn begin(&self, _repositories: u64) {}

    fn repository(&self, _index: u64, _repository: &str) {}

    fn finish(&self) {}
}

/// A progress bar on stderr.
///
/// Nothing is drawn when stderr is not a terminal.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    bar: ProgressBar,
}

impl ProgressReporter {
    #[must_use]
    pub fn new() -> Self {
        let bar = ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::stderr_with_hz(10));
        let style = ProgressStyle::with_template("{prefix:>12.bold.cyan} [{bar:25}] {pos}/{len} {msg}")
            .map_or_else(|_| ProgressStyle::default_bar(), |style| style.progress_chars("=> "));
        bar.set_style(style);
        bar.set_prefix("Analyzing");

        Self { bar }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for ProgressReporter {
    fn begin(&self, repositories: u64) {
        self.bar.set_length(repositories);
        self.bar.set_position(0);
    }

    fn repository(&self, index: u64, repository: &str) {
        self.bar.set_position(index);
        self.bar.set_message(repository.to_string());
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
