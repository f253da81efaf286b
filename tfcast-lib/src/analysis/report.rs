//! Outcome of an analysis run.

use super::monthly::MonthlySeries;
use crate::forecast::{ForecastPolicy, ForecastResult};
use crate::history::{AnalysisWindow, Owner, RepositoryDescriptor};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use strum::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RepoStatus {
    /// At least one qualifying commit in the window.
    Active,

    /// History was read but nothing qualified.
    Inactive,

    /// History could not be read.
    Failed,
}

/// Per-repository outcome.
#[derive(Debug, Clone)]
pub struct RepoResult {
    pub repository: RepositoryDescriptor,
    pub status: RepoStatus,

    /// Qualifying commits anywhere in the window, including days past the last bucket.
    pub total_commits: u64,

    /// Qualifying commits per attributed branch.
    pub branch_commits: BTreeMap<String, u64>,

    pub series: MonthlySeries,

    /// Absent for failed repositories.
    pub forecast: Option<ForecastResult>,

    /// Why the repository failed.
    pub error: Option<String>,
}

impl RepoResult {
    #[must_use]
    pub fn failed(repository: RepositoryDescriptor, error: String) -> Self {
        Self {
            repository,
            status: RepoStatus::Failed,
            total_commits: 0,
            branch_commits: BTreeMap::new(),
            series: MonthlySeries::default(),
            forecast: None,
            error: Some(error),
        }
    }
}

/// Run-wide totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total_repositories: usize,
    pub active_repositories: usize,
    pub inactive_repositories: usize,
    pub failed_repositories: usize,
    pub total_commits: u64,
}

impl Summary {
    #[must_use]
    pub fn from_results(results: &[RepoResult]) -> Self {
        let mut summary = Self {
            total_repositories: results.len(),
            ..Self::default()
        };

        for result in results {
            match result.status {
                RepoStatus::Active => summary.active_repositories += 1,
                RepoStatus::Inactive => summary.inactive_repositories += 1,
                RepoStatus::Failed => summary.failed_repositories += 1,
            }
            summary.total_commits += result.total_commits;
        }

        summary
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub owner: Owner,
    pub window: AnalysisWindow,

    /// First day of the first bucket.
    pub bucket_start: NaiveDate,

    /// Branch restriction, `None` when every branch was traversed.
    pub branch: Option<String>,

    pub policy: ForecastPolicy,
    pub repositories: Vec<RepoResult>,

    /// Sum of the active repositories' series.
    pub series: MonthlySeries,

    pub forecast: ForecastResult,
    pub summary: Summary,

    /// Mean of `series`, rounded to two decimals.
    pub average_monthly_commits: f64,
}

impl AggregateReport {
    pub fn with_status(&self, status: RepoStatus) -> impl Iterator<Item = &RepoResult> {
        self.repositories.iter().filter(move |r| r.status == status)
    }
}
