//! Commit filtering, monthly aggregation and the per-run orchestrator.

mod filter;
mod monthly;
mod orchestrator;
mod progress;
mod report;

pub use filter::{FilteredCommit, classify, is_excluded, is_infra_file};
pub use monthly::{MonthlySeries, bucket, sum};
pub use orchestrator::{RunSettings, analyze};
pub use progress::{NoProgress, Progress, ProgressReporter};
pub use report::{AggregateReport, RepoResult, RepoStatus, Summary};
