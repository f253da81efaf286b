use chrono::{DateTime, Days, NaiveDate};

/// The `[start, end)` date range under analysis.
///
/// An unset start means "from repository inception".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisWindow {
    start: Option<NaiveDate>,
    end: NaiveDate,
}

impl AnalysisWindow {
    #[must_use]
    pub const fn new(start: Option<NaiveDate>, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The window covering the last `days` days up to and including `today`.
    ///
    /// `days == 0` yields an all-time window.
    #[must_use]
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let end = today.checked_add_days(Days::new(1)).unwrap_or(today);
        let start = (days > 0).then(|| today.checked_sub_days(Days::new(u64::from(days))).unwrap_or(NaiveDate::MIN));
        Self { start, end }
    }

    #[must_use]
    pub const fn start(&self) -> Option<NaiveDate> {
        self.start
    }

    /// Exclusive end of the window.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// The last day included in the window.
    #[must_use]
    pub fn last_day(&self) -> NaiveDate {
        self.end.pred_opt().unwrap_or(self.end)
    }

    #[must_use]
    pub const fn is_all_time(&self) -> bool {
        self.start.is_none()
    }

    /// The start a source should use: the configured start, or the epoch when unset.
    #[must_use]
    pub fn effective_start(&self) -> NaiveDate {
        self.start.unwrap_or_else(|| DateTime::UNIX_EPOCH.date_naive())
    }

    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.effective_start() && date < self.end
    }

    /// Number of days in the window, if it is bounded.
    #[must_use]
    pub fn days(&self) -> Option<i64> {
        self.start.map(|start| (self.last_day() - start).num_days())
    }
}
