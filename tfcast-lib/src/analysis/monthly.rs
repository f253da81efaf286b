//! Fixed-width monthly bucketing of qualifying commits.

use super::filter::FilteredCommit;
use chrono::{Days, NaiveDate};
use serde::Serialize;

/// Width of one bucket, an approximation of a calendar month.
pub const BUCKET_DAYS: u64 = 30;

const LABEL_FORMAT: &str = "%Y-%m";

/// One bucket of a [`MonthlySeries`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    /// `YYYY-MM` of the bucket's first day.
    pub label: String,
    pub count: u64,
}

/// Chronological commit counts with an explicit entry for every bucket, zero or not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MonthlySeries {
    months: Vec<MonthCount>,
}

impl MonthlySeries {
    #[must_use]
    pub fn months(&self) -> &[MonthCount] {
        &self.months
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.months.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.months.is_empty()
    }

    pub fn counts(&self) -> impl Iterator<Item = u64> + '_ {
        self.months.iter().map(|m| m.count)
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.counts().sum()
    }

    /// Mean count per bucket, zero for an empty series.
    #[must_use]
    #[expect(clippy::cast_precision_loss, reason = "commit counts are far below 2^52")]
    pub fn average(&self) -> f64 {
        if self.is_empty() {
            return 0.0;
        }
        self.total() as f64 / self.len() as f64
    }
}

/// First day of bucket `index` when buckets are anchored at `start`.
#[must_use]
pub fn bucket_start(start: NaiveDate, index: u64) -> NaiveDate {
    start.checked_add_days(Days::new(index * BUCKET_DAYS)).unwrap_or(NaiveDate::MAX)
}

/// Count commits into `month_count` consecutive 30-day buckets starting at `start`.
///
/// Bucket `i` covers `[start + 30i, start + 30(i + 1))` days. Commits before `start` or past
/// the last bucket are not counted. A `month_count` of zero or less yields an empty series.
#[must_use]
pub fn bucket(commits: &[FilteredCommit], start: NaiveDate, month_count: i64) -> MonthlySeries {
    let Ok(month_count) = u64::try_from(month_count) else {
        return MonthlySeries::default();
    };

    let mut months: Vec<MonthCount> = (0..month_count)
        .map(|i| MonthCount {
            label: bucket_start(start, i).format(LABEL_FORMAT).to_string(),
            count: 0,
        })
        .collect();

    for commit in commits {
        let Ok(offset) = u64::try_from((commit.date - start).num_days()) else {
            continue;
        };

        let index = usize::try_from(offset / BUCKET_DAYS).unwrap_or(usize::MAX);
        if let Some(month) = months.get_mut(index) {
            month.count += 1;
        }
    }

    MonthlySeries { months }
}

/// Element-wise sum of several series.
///
/// Shorter series count as zero past their end. Each entry takes its label from the first
/// series long enough to have one.
#[must_use]
pub fn sum<'a>(series: impl IntoIterator<Item = &'a MonthlySeries>) -> MonthlySeries {
    let mut months: Vec<MonthCount> = Vec::new();

    for s in series {
        for (index, month) in s.months.iter().enumerate() {
            match months.get_mut(index) {
                Some(total) => total.count += month.count,
                None => months.push(month.clone()),
            }
        }
    }

    MonthlySeries { months }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn on(date: NaiveDate) -> FilteredCommit {
        FilteredCommit {
            id: date.to_string(),
            date,
            branch: "main".into(),
            files: vec!["main.tf".into()],
        }
    }

    fn series(counts: &[u64]) -> MonthlySeries {
        MonthlySeries {
            months: counts
                .iter()
                .enumerate()
                .map(|(i, &count)| MonthCount {
                    label: format!("m{i}"),
                    count,
                })
                .collect(),
        }
    }

    fn counts(series: &MonthlySeries) -> Vec<u64> {
        series.counts().collect()
    }

    #[test]
    fn test_empty_commits_give_zero_buckets() {
        let s = bucket(&[], day(2024, 1, 1), 12);
        assert_eq!(s.len(), 12);
        assert!(s.counts().all(|c| c == 0));
        assert_eq!(s.months()[0].label, "2024-01");
        assert_eq!(s.months()[11].label, "2024-11");
    }

    #[test]
    fn test_bucket_boundaries() {
        let start = day(2024, 1, 1);
        let commits = [
            on(start),
            on(day(2024, 1, 30)), // day 29, still bucket 0
            on(day(2024, 1, 31)), // day 30, bucket 1
            on(day(2024, 3, 30)), // day 89, bucket 2
            on(day(2024, 3, 31)), // day 90, past the window
            on(day(2023, 12, 31)),
        ];

        let s = bucket(&commits, start, 3);
        assert_eq!(counts(&s), [2, 1, 1]);
        assert_eq!(s.total(), 4);
    }

    #[test]
    fn test_non_positive_month_count() {
        assert!(bucket(&[on(day(2024, 1, 1))], day(2024, 1, 1), 0).is_empty());
        assert!(bucket(&[], day(2024, 1, 1), -3).is_empty());
    }

    #[test]
    fn test_labels_can_repeat_across_drift() {
        // 30-day buckets drift against calendar months, so two buckets may share a month
        let s = bucket(&[], day(2024, 1, 31), 2);
        assert_eq!(s.months()[0].label, "2024-01");
        assert_eq!(s.months()[1].label, "2024-03");

        let s = bucket(&[], day(2024, 3, 1), 2);
        assert_eq!(s.months()[0].label, "2024-03");
        assert_eq!(s.months()[1].label, "2024-03");
    }

    #[test]
    fn test_sum_zero_pads_shorter_series() {
        let total = sum([&series(&[1, 2, 3]), &series(&[10, 20])]);
        assert_eq!(counts(&total), [11, 22, 3]);
        assert_eq!(total.months()[2].label, "m2");
    }

    #[test]
    fn test_sum_of_nothing_is_empty() {
        assert!(sum(core::iter::empty::<&MonthlySeries>()).is_empty());
    }

    #[test]
    fn test_average() {
        assert!((series(&[1, 2, 3]).average() - 2.0).abs() < f64::EPSILON);
        assert!(MonthlySeries::default().average().abs() < f64::EPSILON);
    }
}
