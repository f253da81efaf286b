//! Remaining-call budget for a rate-limited remote API.

use chrono::{DateTime, Utc};
use core::time::Duration;

const LOG_TARGET: &str = "rate_budget";

/// Call budget as last reported by the remote provider.
///
/// The budget starts out unknown, which is treated as available. Each response updates it
/// from the provider-reported remaining count and reset timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateBudget {
    remaining: Option<u64>,
    reset_at: Option<DateTime<Utc>>,
}

impl RateBudget {
    #[must_use]
    pub const fn new(remaining: u64, reset_at: DateTime<Utc>) -> Self {
        Self {
            remaining: Some(remaining),
            reset_at: Some(reset_at),
        }
    }

    /// Record the budget reported alongside a response.
    pub const fn update(&mut self, remaining: u64, reset_at: DateTime<Utc>) {
        self.remaining = Some(remaining);
        self.reset_at = Some(reset_at);
    }

    #[must_use]
    pub const fn remaining(&self) -> Option<u64> {
        self.remaining
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        matches!(self.remaining, Some(0))
    }

    /// How long to wait before the next call is allowed, measured from `now`.
    ///
    /// Returns `None` when budget remains. An exhausted budget whose reset time has already
    /// passed yields a zero wait.
    #[must_use]
    pub fn wait_duration(&self, now: DateTime<Utc>) -> Option<Duration> {
        if !self.is_exhausted() {
            return None;
        }

        let wait = self
            .reset_at
            .map_or(0, |reset_at| (reset_at - now).num_milliseconds().max(0));

        Some(Duration::from_millis(u64::try_from(wait).unwrap_or(0)))
    }

    /// Block until the budget has reset, if it is exhausted.
    ///
    /// After waiting, the budget becomes unknown again until the next response reports it.
    pub async fn wait_if_exhausted(&mut self) {
        let Some(wait) = self.wait_duration(Utc::now()) else {
            return;
        };

        if !wait.is_zero() {
            log::warn!(target: LOG_TARGET, "Rate limit reached, waiting {:.2}s for the budget to reset", wait.as_secs_f64());
            tokio::time::sleep(wait).await;
        }

        self.remaining = None;
        self.reset_at = None;
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn test_unknown_budget_is_available() {
        let budget = RateBudget::default();
        assert!(!budget.is_exhausted());
        assert_eq!(budget.wait_duration(Utc::now()), None);
    }

    #[test]
    fn test_remaining_budget_needs_no_wait() {
        let now = Utc::now();
        let budget = RateBudget::new(12, now + TimeDelta::minutes(5));
        assert_eq!(budget.wait_duration(now), None);
    }

    #[test]
    fn test_exhausted_budget_waits_until_reset() {
        let now = Utc::now();
        let budget = RateBudget::new(0, now + TimeDelta::seconds(90));
        assert_eq!(budget.wait_duration(now), Some(Duration::from_secs(90)));
    }

    #[test]
    fn test_reset_in_the_past_clamps_to_zero() {
        let now = Utc::now();
        let budget = RateBudget::new(0, now - TimeDelta::seconds(30));
        assert_eq!(budget.wait_duration(now), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_wait_clears_budget() {
        let mut budget = RateBudget::new(0, Utc::now() - TimeDelta::seconds(1));
        budget.wait_if_exhausted().await;
        assert_eq!(budget.remaining(), None);
        assert!(!budget.is_exhausted());
    }

    #[test]
    fn test_update_overwrites() {
        let now = Utc::now();
        let mut budget = RateBudget::default();
        budget.update(0, now);
        assert!(budget.is_exhausted());
        budget.update(4999, now);
        assert_eq!(budget.remaining(), Some(4999));
    }
}
