//! JSON rendering of an [`AggregateReport`].

use crate::Result;
use crate::analysis::{AggregateReport, MonthlySeries, RepoResult, RepoStatus};
use crate::forecast::{ForecastPolicy, ForecastResult};
use crate::history::Owner;
use anyhow::Context;
use camino::Utf8Path;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;

const LOG_TARGET: &str = "reports";

const DATE_FORMAT: &str = "%Y-%m-%d";
const ALL_TIME: &str = "all-time";
const ALL_BRANCHES: &str = "all";

#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    owner: &'a Owner,
    analysis_period: AnalysisPeriod,
    branch_analyzed: &'a str,
    forecast_policy: ForecastPolicy,
    total_repositories: usize,
    active_repositories: usize,
    inactive_repositories: usize,
    failed_repositories: usize,
    total_commits: u64,
    average_monthly_commits: f64,
    monthly_breakdown: BTreeMap<&'a str, u64>,
    predictions: &'a ForecastResult,
    repository_details: RepositoryDetails<'a>,
}

#[derive(Debug, Serialize)]
struct AnalysisPeriod {
    start_date: String,
    end_date: String,
    days_analyzed: DaysAnalyzed,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum DaysAnalyzed {
    Days(i64),
    Unbounded(&'static str),
}

#[derive(Debug, Serialize)]
struct RepositoryDetails<'a> {
    active: Vec<ActiveRepository<'a>>,
    inactive: Vec<&'a str>,
    failed: Vec<FailedRepository<'a>>,
}

#[derive(Debug, Serialize)]
struct ActiveRepository<'a> {
    name: &'a str,
    default_branch: &'a str,
    private: bool,
    total_commits: u64,
    branches: &'a BTreeMap<String, u64>,
    monthly_breakdown: BTreeMap<&'a str, u64>,
    predictions: Option<&'a ForecastResult>,
}

#[derive(Debug, Serialize)]
struct FailedRepository<'a> {
    name: &'a str,
    error: &'a str,
}

/// Month label to count; buckets that share a label are summed.
fn breakdown(series: &MonthlySeries) -> BTreeMap<&str, u64> {
    let mut map = BTreeMap::new();
    for month in series.months() {
        *map.entry(month.label.as_str()).or_insert(0) += month.count;
    }
    map
}

fn active_repository(result: &RepoResult) -> ActiveRepository<'_> {
    ActiveRepository {
        name: &result.repository.name,
        default_branch: &result.repository.default_branch,
        private: result.repository.private,
        total_commits: result.total_commits,
        branches: &result.branch_commits,
        monthly_breakdown: breakdown(&result.series),
        predictions: result.forecast.as_ref(),
    }
}

impl<'a> JsonReport<'a> {
    #[must_use]
    pub fn new(report: &'a AggregateReport) -> Self {
        let window = &report.window;
        let days_analyzed = window.days().map_or(DaysAnalyzed::Unbounded(ALL_TIME), DaysAnalyzed::Days);
        let start = window.start().unwrap_or(report.bucket_start);

        Self {
            owner: &report.owner,
            analysis_period: AnalysisPeriod {
                start_date: start.format(DATE_FORMAT).to_string(),
                end_date: window.last_day().format(DATE_FORMAT).to_string(),
                days_analyzed,
            },
            branch_analyzed: report.branch.as_deref().unwrap_or(ALL_BRANCHES),
            forecast_policy: report.policy,
            total_repositories: report.summary.total_repositories,
            active_repositories: report.summary.active_repositories,
            inactive_repositories: report.summary.inactive_repositories,
            failed_repositories: report.summary.failed_repositories,
            total_commits: report.summary.total_commits,
            average_monthly_commits: report.average_monthly_commits,
            monthly_breakdown: breakdown(&report.series),
            predictions: &report.forecast,
            repository_details: RepositoryDetails {
                active: report.with_status(RepoStatus::Active).map(active_repository).collect(),
                inactive: report
                    .with_status(RepoStatus::Inactive)
                    .map(|r| r.repository.name.as_str())
                    .collect(),
                failed: report
                    .with_status(RepoStatus::Failed)
                    .map(|r| FailedRepository {
                        name: &r.repository.name,
                        error: r.error.as_deref().unwrap_or_default(),
                    })
                    .collect(),
            },
        }
    }
}

/// Render `report` as pretty-printed JSON.
pub fn generate(report: &AggregateReport) -> Result<String> {
    serde_json::to_string_pretty(&JsonReport::new(report)).context("serializing report")
}

/// Write `report` as JSON to `path`.
pub fn write(report: &AggregateReport, path: &Utf8Path) -> Result<()> {
    let json = generate(report)?;
    fs::write(path, json).with_context(|| format!("writing report to '{path}'"))?;
    log::info!(target: LOG_TARGET, "Report saved to '{path}'");
    Ok(())
}
