//! Command-line entry point.

mod color_mode;
mod config;

pub use color_mode::ColorMode;
pub use config::{AnalysisConfig, SourceKind};

use crate::AnalysisError;
use crate::analysis::{ProgressReporter, analyze};
use crate::forecast::{DEFAULT_GROWTH_RATE, ForecastPolicy};
use crate::history::{DEFAULT_API_URL, create_source};
use crate::reports::{generate_console, write_json};
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser};
use log::LevelFilter;
use std::ffi::OsString;
use std::io::Write;

const LOG_TARGET: &str = "tfcast";

const DEFAULT_OUTPUT: &str = "terraform_usage_report.json";

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_CONFIGURATION: i32 = 1;
pub const EXIT_ABORTED: i32 = 2;
pub const EXIT_REPORT: i32 = 3;

/// The process surroundings `run` talks to.
pub trait Host {
    fn output(&mut self) -> impl Write;
    fn error(&mut self) -> impl Write;
    fn exit(&mut self, code: i32);
}

/// Mine infrastructure-as-code commit history across an owner's repositories and forecast
/// future activity.
#[derive(Debug, Parser)]
#[command(name = "tfcast", version)]
pub struct Args {
    /// GitHub token used for API calls and private clones
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub(crate) token: Option<String>,

    /// Organization or user whose repositories are analyzed
    #[arg(long, env = "GITHUB_OWNER")]
    pub(crate) owner: Option<String>,

    #[arg(long, env = "GITHUB_ORG", hide = true)]
    pub(crate) org: Option<String>,

    /// Only analyze this branch [default: all branches]
    #[arg(long, env = "GITHUB_BRANCH")]
    pub(crate) branch: Option<String>,

    /// Length of the trailing analysis window in days; 0 or unset analyzes all history
    #[arg(long, env = "ANALYSIS_DAYS", value_name = "DAYS")]
    pub(crate) days: Option<u32>,

    /// Where commit history comes from
    #[arg(long, value_enum, default_value_t)]
    pub(crate) source: SourceKind,

    /// Directory holding the git working trees to analyze (local source)
    #[arg(long, value_name = "DIR")]
    pub(crate) local_root: Option<Utf8PathBuf>,

    /// Directory for temporary clones (clone source) [default: system temp directory]
    #[arg(long, value_name = "DIR")]
    pub(crate) clone_dir: Option<Utf8PathBuf>,

    /// Forecasting policy
    #[arg(long, value_enum, default_value_t)]
    pub(crate) policy: ForecastPolicy,

    /// Monthly growth rate applied by the growth policy
    #[arg(long, default_value_t = DEFAULT_GROWTH_RATE, allow_negative_numbers = true)]
    pub(crate) growth_rate: f64,

    /// How many months ahead the trend adjustment reaches
    #[arg(long, default_value_t = 1)]
    pub(crate) months_ahead: u32,

    /// Report file
    #[arg(long, short, default_value = DEFAULT_OUTPUT, value_name = "FILE")]
    pub(crate) output: Utf8PathBuf,

    /// When to color console output
    #[arg(long, value_enum, default_value_t)]
    pub(crate) color: ColorMode,

    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL, hide = true)]
    pub(crate) api_url: String,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(long, short, action = ArgAction::Count)]
    pub(crate) verbose: u8,
}

/// Why a run ended early.
#[derive(Debug)]
enum Failure {
    Analysis(AnalysisError),
    Report(anyhow::Error),
}

impl Failure {
    const fn exit_code(&self) -> i32 {
        match self {
            Self::Analysis(AnalysisError::Configuration(_)) => EXIT_CONFIGURATION,
            Self::Analysis(_) => EXIT_ABORTED,
            Self::Report(_) => EXIT_REPORT,
        }
    }
}

impl From<AnalysisError> for Failure {
    fn from(err: AnalysisError) -> Self {
        Self::Analysis(err)
    }
}

impl core::fmt::Display for Failure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Analysis(e) => write!(f, "{e}"),
            Self::Report(e) => write!(f, "{e:#}"),
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // a second run in the same process keeps the first logger
    let _ = env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .try_init();
}

/// Parse `args`, run the analysis and report through `host`.
///
/// Exits with 0 on success, 1 on a configuration error, 2 when the run is aborted and 3 when
/// the report cannot be written.
pub async fn run<H, I, T>(host: &mut H, args: I)
where
    H: Host,
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let args = match Args::try_parse_from(args) {
        Ok(args) => args,
        Err(e) => {
            let code = if e.use_stderr() {
                let _ = write!(host.error(), "{e}");
                EXIT_CONFIGURATION
            } else {
                let _ = write!(host.output(), "{e}");
                EXIT_SUCCESS
            };
            host.exit(code);
            return;
        }
    };

    init_logging(args.verbose);

    match execute(host, &args).await {
        Ok(()) => host.exit(EXIT_SUCCESS),
        Err(e) => {
            let _ = writeln!(host.error(), "error: {e}");
            host.exit(e.exit_code());
        }
    }
}

async fn execute<H: Host>(host: &mut H, args: &Args) -> Result<(), Failure> {
    let config = AnalysisConfig::from_args(args)?;
    let today = chrono::Local::now().date_naive();
    let settings = config.run_settings(today);

    let (mut source, owner) = create_source(config.source.clone()).await?;
    log::info!(target: LOG_TARGET, "Analyzing {} '{}' with the {} policy", owner.kind, owner.name, config.policy);

    let progress = ProgressReporter::new();
    let report = analyze(&mut source, owner, &settings, &progress).await?;

    write_json(&report, &config.output).map_err(Failure::Report)?;

    let mut out = host.output();
    let _ = writeln!(out, "Analysis complete! Report saved to {}", config.output);
    generate_console(&report, &mut out, config.color.use_colors()).map_err(Failure::Report)?;

    Ok(())
}
