#![doc(hidden)]
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! This is an implementation detail of the tfcast tool. Do not take a dependency on this crate
//! as it may change in incompatible ways without warning.

// Core library for tfcast
//
// This library mines infrastructure-as-code commit history across an owner's repositories,
// aggregates it into a monthly series, and forecasts future activity.
//
// # Module Organization
//
// - [`commands`]: Command-line interface, configuration and orchestration entry point
// - [`history`]: Commit history sources (GitHub API, temporary clones, local working trees)
// - [`analysis`]: Commit filtering, monthly bucketing and the per-run orchestrator
// - [`forecast`]: Trend fitting and projection
// - [`reports`]: JSON report and console summary

pub type Result<T, E = anyhow::Error> = core::result::Result<T, E>;

mod error;

macro_rules! declare_modules {
    ($($mod:ident),+ $(,)?) => {
        $(
            #[cfg(debug_assertions)]
            pub mod $mod;
            #[cfg(not(debug_assertions))]
            mod $mod;
        )+
    };
}

declare_modules!(analysis, commands, forecast, history, reports);

pub use crate::commands::{Host, run};
pub use crate::error::AnalysisError;
