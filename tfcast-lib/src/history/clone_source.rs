use super::commit_record::{CommitRecord, UNKNOWN_BRANCH};
use super::git;
use super::github::{GitHubClient, discover_repositories};
use super::owner::OwnerKind;
use super::repository::RepositoryDescriptor;
use super::window::AnalysisWindow;
use super::{HistorySource, repository_error};
use crate::AnalysisError;
use crate::Result;
use anyhow::{Context, anyhow};
use camino::Utf8PathBuf;
use std::path::Path;
use tempfile::Builder;
use url::Url;

const LOG_TARGET: &str = "clone";

/// User name GitHub accepts alongside a token in an HTTPS clone URL.
const TOKEN_USER: &str = "x-access-token";

/// History read from a temporary clone of each repository.
///
/// Repositories are discovered through the API; each one is cloned into its own scratch
/// directory which is removed once its history has been read, whatever the outcome.
#[derive(Debug)]
pub struct CloneSource {
    client: GitHubClient,
    owner: String,
    kind: OwnerKind,
    clone_root: Option<Utf8PathBuf>,
}

impl CloneSource {
    /// Create a clone-backed source.
    ///
    /// Scratch directories go under `clone_root`, or the system temporary directory when unset.
    #[must_use]
    pub fn new(client: GitHubClient, owner: impl Into<String>, kind: OwnerKind, clone_root: Option<Utf8PathBuf>) -> Self {
        Self {
            client,
            owner: owner.into(),
            kind,
            clone_root,
        }
    }

    async fn clone_and_log(
        &self,
        checkout: &Path,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> Result<Vec<CommitRecord>> {
        let url = clone_url(repo, self.client.token())?;
        git::clone_repo(checkout, &url, &repo.locator).await?;

        let rev = branch.map(|b| format!("origin/{b}"));
        git::infra_log(checkout, window, rev.as_deref(), branch.unwrap_or(UNKNOWN_BRANCH)).await
    }
}

/// The URL to clone `repo` from, carrying the token when the repository is private.
fn clone_url(repo: &RepositoryDescriptor, token: &str) -> Result<Url> {
    let mut url = Url::parse(&repo.locator).with_context(|| format!("parsing clone URL '{}'", repo.locator))?;
    if repo.private {
        url.set_username(TOKEN_USER)
            .and_then(|()| url.set_password(Some(token)))
            .map_err(|()| anyhow!("cannot embed credentials in clone URL '{}'", repo.locator))?;
    }
    Ok(url)
}

impl HistorySource for CloneSource {
    async fn list_repositories(&mut self) -> Result<Vec<RepositoryDescriptor>, AnalysisError> {
        discover_repositories(&mut self.client, &self.owner, self.kind).await
    }

    async fn commits_in_window(
        &mut self,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> Result<Vec<CommitRecord>, AnalysisError> {
        let prefix = format!("{}-", repo.name);
        let mut builder = Builder::new();
        let _ = builder.prefix(&prefix);

        let dir = match &self.clone_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .context("creating clone directory")
        .map_err(|e| AnalysisError::fetch(&repo.name, &e))?;

        let result = self.clone_and_log(&dir.path().join("checkout"), repo, window, branch).await;

        let dir_path = dir.path().display().to_string();
        if let Err(e) = dir.close() {
            log::warn!(target: LOG_TARGET, "Could not remove clone directory '{dir_path}': {e}");
        }

        result.map_err(|e| repository_error(&repo.name, &e))
    }
}
