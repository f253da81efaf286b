//! Human-readable run summary.

use crate::Result;
use crate::analysis::{AggregateReport, RepoStatus};
use crate::forecast::Confidence;
use owo_colors::{OwoColorize, Style};
use std::io::Write;

const ALL_BRANCHES: &str = "all";

fn paint(text: impl core::fmt::Display, style: Style, use_colors: bool) -> String {
    if use_colors {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}

fn confidence_style(confidence: Confidence) -> Style {
    match confidence {
        Confidence::High => Style::new().green(),
        Confidence::Medium => Style::new().yellow(),
        Confidence::Low => Style::new().red(),
    }
}

/// Write the summary of `report` to `writer`.
pub fn generate<W: Write>(report: &AggregateReport, writer: &mut W, use_colors: bool) -> Result<()> {
    let heading = Style::new().bold();
    let summary = &report.summary;
    let confidence = paint(report.forecast.confidence, confidence_style(report.forecast.confidence), use_colors);

    writeln!(writer)?;
    writeln!(writer, "{}", paint("Summary:", heading, use_colors))?;
    writeln!(writer, "Owner: {} ({})", report.owner.name, report.owner.kind)?;
    writeln!(writer, "Branch analyzed: {}", report.branch.as_deref().unwrap_or(ALL_BRANCHES))?;
    writeln!(
        writer,
        "Repositories: {} total, {} active, {} inactive, {} failed",
        summary.total_repositories, summary.active_repositories, summary.inactive_repositories, summary.failed_repositories
    )?;
    writeln!(writer, "Total Terraform commits: {}", summary.total_commits)?;
    writeln!(writer, "Average monthly commits: {:.2}", report.average_monthly_commits)?;
    writeln!(writer, "Predicted monthly usage: {}", report.forecast.monthly)?;
    writeln!(writer, "Predicted annual usage: {}", report.forecast.annual)?;
    writeln!(writer, "Confidence: {confidence}")?;

    if !report.series.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", paint("Monthly Breakdown:", heading, use_colors))?;
        for month in report.series.months() {
            writeln!(writer, "- {}: {} commits", month.label, month.count)?;
        }
    }

    let active: Vec<_> = report.with_status(RepoStatus::Active).collect();
    if !active.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", paint("Per-Repository Breakdown:", heading, use_colors))?;
        for result in active {
            writeln!(writer)?;
            writeln!(writer, "{}:", paint(&result.repository.name, Style::new().cyan(), use_colors))?;
            writeln!(writer, "- Total commits: {}", result.total_commits)?;
            writeln!(writer, "- Average monthly: {:.1}", result.series.average())?;
            if let Some(forecast) = &result.forecast {
                writeln!(writer, "- Predicted monthly: {}", forecast.monthly)?;
            }
        }
    }

    let inactive: Vec<_> = report.with_status(RepoStatus::Inactive).map(|r| r.repository.name.as_str()).collect();
    if !inactive.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", paint("Inactive Repositories (excluded from predictions):", heading, use_colors))?;
        writeln!(writer, "- {}", inactive.join(", "))?;
    }

    let failed: Vec<_> = report.with_status(RepoStatus::Failed).collect();
    if !failed.is_empty() {
        writeln!(writer)?;
        writeln!(writer, "{}", paint("Failed repositories:", heading, use_colors))?;
        for result in failed {
            writeln!(
                writer,
                "  {}: {}",
                paint(&result.repository.name, Style::new().red(), use_colors),
                result.error.as_deref().unwrap_or_default()
            )?;
        }
    }

    let factors = &report.forecast.factors;
    writeln!(writer)?;
    writeln!(writer, "{}", paint("Prediction Factors (Based on Active Repositories):", heading, use_colors))?;
    writeln!(writer, "- Historical trend: {} commits/month", factors.historical_trend)?;
    writeln!(writer, "- Growth rate: {}%", percent(factors.growth_rate))?;
    writeln!(writer, "- Data variance: {}", factors.variance)?;

    Ok(())
}

/// A fraction as a percentage with at most two decimals.
fn percent(fraction: f64) -> f64 {
    (fraction * 10_000.0).round() / 100.0
}
