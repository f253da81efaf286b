//! Commit history sources.
//!
//! A [`HistorySource`] lists an owner's repositories and yields each repository's commits
//! within an [`AnalysisWindow`]. Three realizations exist: the GitHub REST API, temporary
//! clones read with `git log`, and working trees already on disk. [`create_source`] picks one
//! at startup and resolves the owner it analyzes.

mod clone_source;
mod commit_record;
mod git;
mod github;
mod local_source;
mod owner;
mod rate_budget;
mod repository;
mod window;

pub use clone_source::CloneSource;
pub use commit_record::{CommitRecord, UNKNOWN_BRANCH};
pub use github::{DEFAULT_API_URL, GitHubSource};
pub use local_source::LocalSource;
pub use owner::{Owner, OwnerKind};
pub use repository::RepositoryDescriptor;
pub use window::AnalysisWindow;

use crate::AnalysisError;
use camino::Utf8PathBuf;
use git::TraversalFailure;
use github::GitHubClient;

/// Supplies repositories and their commit history.
///
/// Listing failures are fatal to a run. Failures for a single repository are reported as
/// [`AnalysisError::RepositoryFetch`] or [`AnalysisError::Traversal`] so the caller can carry on.
pub trait HistorySource {
    /// List the repositories to analyze, in processing order.
    fn list_repositories(&mut self) -> impl Future<Output = Result<Vec<RepositoryDescriptor>, AnalysisError>> + Send;

    /// Commits of `repo` dated within `window` that touch infrastructure files.
    ///
    /// With no `branch`, every branch is traversed and a commit reachable from several of them
    /// is reported once.
    fn commits_in_window(
        &mut self,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> impl Future<Output = Result<Vec<CommitRecord>, AnalysisError>> + Send;
}

/// How to obtain history, as chosen on the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceSpec {
    /// Everything through the GitHub REST API.
    GitHub { api_url: String, token: String, owner: String },

    /// Discovery through the API, history from temporary clones.
    Clone {
        api_url: String,
        token: String,
        owner: String,
        clone_root: Option<Utf8PathBuf>,
    },

    /// Working trees on disk.
    Local { root: Utf8PathBuf },
}

/// The history source selected for a run.
#[derive(Debug)]
pub enum Source {
    GitHub(GitHubSource),
    Clone(CloneSource),
    Local(LocalSource),
}

impl HistorySource for Source {
    async fn list_repositories(&mut self) -> Result<Vec<RepositoryDescriptor>, AnalysisError> {
        match self {
            Self::GitHub(source) => source.list_repositories().await,
            Self::Clone(source) => source.list_repositories().await,
            Self::Local(source) => source.list_repositories().await,
        }
    }

    async fn commits_in_window(
        &mut self,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> Result<Vec<CommitRecord>, AnalysisError> {
        match self {
            Self::GitHub(source) => source.commits_in_window(repo, window, branch).await,
            Self::Clone(source) => source.commits_in_window(repo, window, branch).await,
            Self::Local(source) => source.commits_in_window(repo, window, branch).await,
        }
    }
}

/// Build the source described by `spec` and resolve the owner it analyzes.
///
/// For API-backed sources the owner is looked up as an organization first, then as a user.
pub async fn create_source(spec: SourceSpec) -> Result<(Source, Owner), AnalysisError> {
    match spec {
        SourceSpec::GitHub { api_url, token, owner } => {
            let (client, kind) = connect(&api_url, token, &owner).await?;
            let source = GitHubSource::new(client, owner.as_str(), kind);
            Ok((Source::GitHub(source), Owner::new(owner, kind)))
        }

        SourceSpec::Clone {
            api_url,
            token,
            owner,
            clone_root,
        } => {
            let (client, kind) = connect(&api_url, token, &owner).await?;
            let source = CloneSource::new(client, owner.as_str(), kind, clone_root);
            Ok((Source::Clone(source), Owner::new(owner, kind)))
        }

        SourceSpec::Local { root } => {
            let name = root.file_name().map_or_else(|| root.to_string(), ToString::to_string);
            Ok((Source::Local(LocalSource::new(root)), Owner::new(name, OwnerKind::Local)))
        }
    }
}

async fn connect(api_url: &str, token: String, owner: &str) -> Result<(GitHubClient, OwnerKind), AnalysisError> {
    let mut client = GitHubClient::new(api_url, token).map_err(|e| AnalysisError::Configuration(format!("{e:#}")))?;
    let kind = client.resolve_owner(owner).await?;
    Ok((client, kind))
}

/// Classify a per-repository failure: a failed traversal command, or anything else.
pub(crate) fn repository_error(repo: &str, err: &anyhow::Error) -> AnalysisError {
    if err.chain().any(|cause| cause.downcast_ref::<TraversalFailure>().is_some()) {
        AnalysisError::Traversal {
            repo: repo.to_string(),
            reason: format!("{err:#}"),
        }
    } else {
        AnalysisError::fetch(repo, err)
    }
}
