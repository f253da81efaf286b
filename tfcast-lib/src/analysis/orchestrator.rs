//! Drives a run from repository listing to the aggregate forecast.

use super::filter::{FilteredCommit, classify};
use super::monthly::{self, BUCKET_DAYS, MonthlySeries};
use super::progress::Progress;
use super::report::{AggregateReport, RepoResult, RepoStatus, Summary};
use crate::AnalysisError;
use crate::forecast::Forecaster;
use crate::history::{AnalysisWindow, HistorySource, Owner, RepositoryDescriptor};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::time::Instant;

const LOG_TARGET: &str = "orchestrator";

/// Parameters of a run that do not depend on the history source.
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub window: AnalysisWindow,

    /// Restrict history to this branch; every branch when `None`.
    pub branch: Option<String>,

    pub forecaster: Forecaster,
}

/// Where buckets start and how many there are.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketPlan {
    pub start: NaiveDate,
    pub count: i64,
}

impl BucketPlan {
    /// Lay buckets over `window`.
    ///
    /// A bounded window is covered by as many whole buckets as fit, at least one. An all-time
    /// window starts at the earliest qualifying commit, or the window's last day when there
    /// are none, and is covered up to its last day.
    #[must_use]
    pub fn for_window(window: &AnalysisWindow, earliest: Option<NaiveDate>) -> Self {
        let bucket_days = i64::try_from(BUCKET_DAYS).unwrap_or(i64::MAX);

        match window.start() {
            Some(start) => Self {
                start,
                count: ((window.end() - start).num_days() / bucket_days).max(1),
            },
            None => {
                let start = earliest.unwrap_or_else(|| window.last_day());
                let elapsed = (window.end() - start).num_days().max(1);
                Self {
                    start,
                    count: ((elapsed + bucket_days - 1) / bucket_days).max(1),
                }
            }
        }
    }
}

/// Analyze every repository `source` lists for `owner`.
///
/// Repositories are processed one at a time, in listing order. A repository whose history
/// cannot be read is recorded as failed and the run continues; only a listing failure aborts.
pub async fn analyze<S, P>(source: &mut S, owner: Owner, settings: &RunSettings, progress: &P) -> Result<AggregateReport, AnalysisError>
where
    S: HistorySource,
    P: Progress,
{
    let start_time = Instant::now();
    let repos = source.list_repositories().await?;
    log::info!(target: LOG_TARGET, "Analyzing {} repositories owned by '{}'", repos.len(), owner.name);

    progress.begin(repos.len() as u64);
    let mut fetched = Vec::with_capacity(repos.len());
    for (index, repo) in repos.into_iter().enumerate() {
        progress.repository(index as u64, &repo.name);
        let outcome = fetch_filtered(source, &repo, settings).await;
        fetched.push((repo, outcome));
    }
    progress.finish();

    let earliest = fetched
        .iter()
        .filter_map(|(_, outcome)| outcome.as_ref().ok())
        .flatten()
        .map(|c| c.date)
        .min();
    let plan = BucketPlan::for_window(&settings.window, earliest);
    log::debug!(target: LOG_TARGET, "Bucketing from {} into {} buckets of {BUCKET_DAYS} days", plan.start, plan.count);

    let repositories: Vec<RepoResult> = fetched
        .into_iter()
        .map(|(repo, outcome)| match outcome {
            Ok(commits) => repository_result(repo, &commits, plan, &settings.forecaster),
            Err(e) => RepoResult::failed(repo, e.to_string()),
        })
        .collect();

    let active: Vec<&MonthlySeries> = repositories
        .iter()
        .filter(|r| r.status == RepoStatus::Active)
        .map(|r| &r.series)
        .collect();

    let zero = monthly::bucket(&[], plan.start, plan.count);
    let series = monthly::sum(core::iter::once(&zero).chain(active.iter().copied()));

    let forecast = if active.is_empty() {
        settings.forecaster.forecast(&MonthlySeries::default())
    } else {
        settings.forecaster.forecast(&series)
    };

    let summary = Summary::from_results(&repositories);
    log::info!(
        target: LOG_TARGET,
        "Analyzed {} repositories ({} active, {} inactive, {} failed) in {:.3}s",
        summary.total_repositories,
        summary.active_repositories,
        summary.inactive_repositories,
        summary.failed_repositories,
        start_time.elapsed().as_secs_f64()
    );

    Ok(AggregateReport {
        owner,
        window: settings.window,
        bucket_start: plan.start,
        branch: settings.branch.clone(),
        policy: settings.forecaster.policy(),
        average_monthly_commits: round2(series.average()),
        repositories,
        series,
        forecast,
        summary,
    })
}

async fn fetch_filtered<S: HistorySource>(
    source: &mut S,
    repo: &RepositoryDescriptor,
    settings: &RunSettings,
) -> Result<Vec<FilteredCommit>, AnalysisError> {
    match source.commits_in_window(repo, &settings.window, settings.branch.as_deref()).await {
        Ok(commits) => {
            let filtered: Vec<FilteredCommit> = commits.iter().filter_map(classify).collect();
            log::debug!(target: LOG_TARGET, "'{repo}': {} of {} commits qualify", filtered.len(), commits.len());
            Ok(filtered)
        }
        Err(e) => {
            log::warn!(target: LOG_TARGET, "Skipping '{repo}': {e}");
            Err(e)
        }
    }
}

fn repository_result(repo: RepositoryDescriptor, commits: &[FilteredCommit], plan: BucketPlan, forecaster: &Forecaster) -> RepoResult {
    let series = monthly::bucket(commits, plan.start, plan.count);

    let mut branch_commits = BTreeMap::new();
    for commit in commits {
        *branch_commits.entry(commit.branch.clone()).or_insert(0) += 1;
    }

    let status = if commits.is_empty() { RepoStatus::Inactive } else { RepoStatus::Active };

    RepoResult {
        repository: repo,
        status,
        total_commits: commits.len() as u64,
        branch_commits,
        forecast: Some(forecaster.forecast(&series)),
        series,
        error: None,
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
