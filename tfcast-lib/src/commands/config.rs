use super::Args;
use super::color_mode::ColorMode;
use crate::AnalysisError;
use crate::analysis::RunSettings;
use crate::forecast::{ForecastPolicy, Forecaster};
use crate::history::{AnalysisWindow, SourceSpec};
use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::ValueEnum;

/// Where commit history comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// The GitHub REST API.
    #[default]
    Api,

    /// Temporary clones of the owner's repositories.
    Clone,

    /// Git working trees under a local directory.
    Local,
}

/// Validated settings for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub source: SourceSpec,
    pub branch: Option<String>,

    /// Trailing window length; `None` analyzes all history.
    pub days: Option<u32>,

    pub policy: ForecastPolicy,
    pub growth_rate: f64,
    pub months_ahead: u32,
    pub output: Utf8PathBuf,
    pub color: ColorMode,
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty()).map(ToString::to_string)
}

fn config_err(message: impl Into<String>) -> AnalysisError {
    AnalysisError::Configuration(message.into())
}

impl AnalysisConfig {
    /// Validate parsed arguments.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required value is missing or a value is out of range
    pub fn from_args(args: &Args) -> Result<Self, AnalysisError> {
        let source = match args.source {
            SourceKind::Api | SourceKind::Clone => {
                let token = non_empty(args.token.as_ref())
                    .ok_or_else(|| config_err("no GitHub credential, set GITHUB_TOKEN or pass --token"))?;
                let owner = non_empty(args.owner.as_ref())
                    .or_else(|| non_empty(args.org.as_ref()))
                    .ok_or_else(|| config_err("no owner to analyze, set GITHUB_OWNER (or GITHUB_ORG) or pass --owner"))?;
                let api_url = args.api_url.clone();

                if args.source == SourceKind::Api {
                    SourceSpec::GitHub { api_url, token, owner }
                } else {
                    if let Some(dir) = &args.clone_dir
                        && !dir.is_dir()
                    {
                        return Err(config_err(format!("clone directory '{dir}' does not exist")));
                    }

                    SourceSpec::Clone {
                        api_url,
                        token,
                        owner,
                        clone_root: args.clone_dir.clone(),
                    }
                }
            }

            SourceKind::Local => {
                let root = args
                    .local_root
                    .clone()
                    .ok_or_else(|| config_err("the local source needs --local-root"))?;
                if !root.is_dir() {
                    return Err(config_err(format!("local root '{root}' is not a directory")));
                }
                SourceSpec::Local { root }
            }
        };

        let config = Self {
            source,
            branch: non_empty(args.branch.as_ref()),
            days: args.days.filter(|&d| d > 0),
            policy: args.policy,
            growth_rate: args.growth_rate,
            months_ahead: args.months_ahead,
            output: args.output.clone(),
            color: args.color,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        if !self.growth_rate.is_finite() || self.growth_rate <= -1.0 {
            return Err(config_err(format!("growth rate must be a number above -1, got {}", self.growth_rate)));
        }

        if self.months_ahead == 0 {
            return Err(config_err("months ahead must be at least 1"));
        }

        Ok(())
    }

    /// The window ending on `today`.
    #[must_use]
    pub fn window(&self, today: NaiveDate) -> AnalysisWindow {
        AnalysisWindow::trailing(today, self.days.unwrap_or(0))
    }

    #[must_use]
    pub fn run_settings(&self, today: NaiveDate) -> RunSettings {
        RunSettings {
            window: self.window(today),
            branch: self.branch.clone(),
            forecaster: Forecaster::new(self.policy, self.growth_rate, self.months_ahead),
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::forecast::DEFAULT_GROWTH_RATE;
    use crate::history::DEFAULT_API_URL;

    fn base_args() -> Args {
        Args {
            token: Some("secret".into()),
            owner: Some("acme".into()),
            org: None,
            branch: None,
            days: Some(365),
            source: SourceKind::Api,
            local_root: None,
            clone_dir: None,
            policy: ForecastPolicy::Growth,
            growth_rate: DEFAULT_GROWTH_RATE,
            months_ahead: 1,
            output: Utf8PathBuf::from("terraform_usage_report.json"),
            color: ColorMode::Never,
            api_url: DEFAULT_API_URL.into(),
            verbose: 0,
        }
    }

    fn config_error(args: &Args) -> String {
        let err = AnalysisConfig::from_args(args).unwrap_err();
        assert!(matches!(err, AnalysisError::Configuration(_)));
        err.to_string()
    }

    #[test]
    fn test_valid_api_config() {
        let config = AnalysisConfig::from_args(&base_args()).unwrap();
        assert_eq!(
            config.source,
            SourceSpec::GitHub {
                api_url: DEFAULT_API_URL.into(),
                token: "secret".into(),
                owner: "acme".into(),
            }
        );
        assert_eq!(config.days, Some(365));
        assert_eq!(config.branch, None);
    }

    #[test]
    fn test_missing_token() {
        let args = Args { token: None, ..base_args() };
        assert!(config_error(&args).contains("GITHUB_TOKEN"));

        let args = Args {
            token: Some("  ".into()),
            ..base_args()
        };
        assert!(config_error(&args).contains("GITHUB_TOKEN"));
    }

    #[test]
    fn test_missing_owner() {
        let args = Args { owner: None, ..base_args() };
        assert!(config_error(&args).contains("GITHUB_OWNER"));
    }

    #[test]
    fn test_org_is_owner_fallback() {
        let args = Args {
            owner: None,
            org: Some("legacy-org".into()),
            ..base_args()
        };
        let config = AnalysisConfig::from_args(&args).unwrap();
        assert!(matches!(config.source, SourceSpec::GitHub { ref owner, .. } if owner == "legacy-org"));
    }

    #[test]
    fn test_zero_days_is_all_time() {
        let args = Args { days: Some(0), ..base_args() };
        let config = AnalysisConfig::from_args(&args).unwrap();
        assert_eq!(config.days, None);

        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        assert!(config.window(today).is_all_time());

        let args = Args { days: None, ..base_args() };
        assert_eq!(AnalysisConfig::from_args(&args).unwrap().days, None);
    }

    #[test]
    fn test_empty_branch_means_all_branches() {
        let args = Args {
            branch: Some(String::new()),
            ..base_args()
        };
        assert_eq!(AnalysisConfig::from_args(&args).unwrap().branch, None);

        let args = Args {
            branch: Some("release".into()),
            ..base_args()
        };
        assert_eq!(AnalysisConfig::from_args(&args).unwrap().branch.as_deref(), Some("release"));
    }

    #[test]
    fn test_growth_rate_range() {
        for rate in [-1.0, -2.5, f64::NAN, f64::INFINITY] {
            let args = Args { growth_rate: rate, ..base_args() };
            assert!(config_error(&args).contains("growth rate"));
        }

        let args = Args { growth_rate: -0.5, ..base_args() };
        let _ = AnalysisConfig::from_args(&args).unwrap();
    }

    #[test]
    fn test_months_ahead_must_be_positive() {
        let args = Args { months_ahead: 0, ..base_args() };
        assert!(config_error(&args).contains("months ahead"));
    }

    #[test]
    fn test_local_source_needs_root() {
        let args = Args {
            source: SourceKind::Local,
            token: None,
            owner: None,
            ..base_args()
        };
        assert!(config_error(&args).contains("--local-root"));
    }

    #[test]
    fn test_local_source_root_must_exist() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();

        let args = Args {
            source: SourceKind::Local,
            local_root: Some(root.join("missing")),
            ..base_args()
        };
        assert!(config_error(&args).contains("not a directory"));

        let args = Args {
            source: SourceKind::Local,
            token: None,
            owner: None,
            local_root: Some(root.clone()),
            ..base_args()
        };
        let config = AnalysisConfig::from_args(&args).unwrap();
        assert_eq!(config.source, SourceSpec::Local { root });
    }

    #[test]
    fn test_clone_source() {
        let args = Args {
            source: SourceKind::Clone,
            ..base_args()
        };
        let config = AnalysisConfig::from_args(&args).unwrap();
        assert!(matches!(config.source, SourceSpec::Clone { clone_root: None, .. }));

        let args = Args {
            source: SourceKind::Clone,
            clone_dir: Some(Utf8PathBuf::from("/definitely/not/here")),
            ..base_args()
        };
        assert!(config_error(&args).contains("clone directory"));
    }

    #[test]
    fn test_run_settings() {
        let args = Args {
            policy: ForecastPolicy::Linear,
            branch: Some("main".into()),
            ..base_args()
        };
        let config = AnalysisConfig::from_args(&args).unwrap();
        let today = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
        let settings = config.run_settings(today);

        assert_eq!(settings.window.start(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(settings.branch.as_deref(), Some("main"));
        assert_eq!(settings.forecaster.policy(), ForecastPolicy::Linear);
    }
}
