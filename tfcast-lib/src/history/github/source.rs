use super::client::GitHubClient;
use super::models::Repo;
use crate::AnalysisError;
use crate::Result;
use crate::analysis::is_excluded;
use crate::history::HistorySource;
use crate::history::commit_record::CommitRecord;
use crate::history::owner::OwnerKind;
use crate::history::repository::RepositoryDescriptor;
use crate::history::window::AnalysisWindow;
use std::collections::HashSet;
use std::time::Instant;

const LOG_TARGET: &str = "github";

/// Branch assumed when the API does not report a default branch.
const FALLBACK_DEFAULT_BRANCH: &str = "main";

/// List the owner's infrastructure repositories, most recently updated first.
///
/// Any failure here means the owner's repositories cannot be enumerated at all, which is an
/// access error.
pub async fn discover_repositories(
    client: &mut GitHubClient,
    owner: &str,
    kind: OwnerKind,
) -> Result<Vec<RepositoryDescriptor>, AnalysisError> {
    let repos = client
        .search_repositories(owner, kind)
        .await
        .map_err(|e| AnalysisError::Access(format!("listing repositories for '{owner}': {e:#}")))?;

    log::info!(target: LOG_TARGET, "Found {} infrastructure repositories for '{owner}'", repos.len());
    Ok(repos.into_iter().map(descriptor_from).collect())
}

fn descriptor_from(repo: Repo) -> RepositoryDescriptor {
    RepositoryDescriptor {
        name: repo.name,
        default_branch: repo.default_branch.unwrap_or_else(|| FALLBACK_DEFAULT_BRANCH.to_string()),
        private: repo.private,
        locator: repo.clone_url,
        updated_at: repo.updated_at,
    }
}

/// History served entirely by the GitHub REST API.
///
/// Changed paths come from per-commit detail calls, so each qualifying commit costs one
/// call from the core budget.
#[derive(Debug)]
pub struct GitHubSource {
    client: GitHubClient,
    owner: String,
    kind: OwnerKind,
}

impl GitHubSource {
    #[must_use]
    pub fn new(client: GitHubClient, owner: impl Into<String>, kind: OwnerKind) -> Self {
        Self {
            client,
            owner: owner.into(),
            kind,
        }
    }

    async fn fetch_commits(
        &mut self,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> Result<Vec<CommitRecord>> {
        let branches = match branch {
            Some(branch) => vec![branch.to_string()],
            None => self.client.list_branches(&self.owner, &repo.name).await?,
        };

        let mut seen = HashSet::new();
        let mut commits = Vec::new();

        for branch in &branches {
            let summaries = self
                .client
                .list_commits(&self.owner, &repo.name, Some(branch), window.effective_start(), window.end())
                .await?;

            for summary in summaries {
                if !seen.insert(summary.sha.clone()) {
                    continue;
                }

                let Some(date) = summary.commit.date().map(|d| d.date_naive()) else {
                    log::debug!(target: LOG_TARGET, "Commit '{}' in '{repo}' has no date, skipping", summary.sha);
                    continue;
                };

                if !window.contains(date) {
                    continue;
                }

                // excluded commits never count, so their changed paths are not worth a call
                let files = if is_excluded(&summary.commit.message) {
                    Vec::new()
                } else {
                    let detail = self.client.commit_detail(&self.owner, &repo.name, &summary.sha).await?;
                    detail.files.into_iter().map(|f| f.filename).collect()
                };

                commits.push(CommitRecord::new(summary.sha, date, summary.commit.message, files, branch.as_str())?);
            }
        }

        Ok(commits)
    }
}

impl HistorySource for GitHubSource {
    async fn list_repositories(&mut self) -> Result<Vec<RepositoryDescriptor>, AnalysisError> {
        discover_repositories(&mut self.client, &self.owner, self.kind).await
    }

    async fn commits_in_window(
        &mut self,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> Result<Vec<CommitRecord>, AnalysisError> {
        let start_time = Instant::now();
        let commits = self
            .fetch_commits(repo, window, branch)
            .await
            .map_err(|e| AnalysisError::fetch(&repo.name, &e))?;

        log::debug!(
            target: LOG_TARGET,
            "Fetched {} commits for '{repo}' in {:.3}s",
            commits.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(commits)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SHA_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const SHA_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const SHA_C: &str = "cccccccccccccccccccccccccccccccccccccccc";

    fn window() -> AnalysisWindow {
        AnalysisWindow::new(NaiveDate::from_ymd_opt(2024, 1, 1), NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
    }

    fn network_repo() -> RepositoryDescriptor {
        RepositoryDescriptor {
            name: "network".to_string(),
            default_branch: "main".to_string(),
            private: false,
            locator: "https://github.com/acme/network.git".to_string(),
            updated_at: None,
        }
    }

    fn summary(sha: &str, date: &str, message: &str) -> serde_json::Value {
        json!({ "sha": sha, "commit": { "message": message, "author": { "date": date } } })
    }

    fn detail(sha: &str, date: &str, files: &[&str]) -> serde_json::Value {
        let files: Vec<_> = files.iter().map(|f| json!({ "filename": f })).collect();
        json!({ "sha": sha, "commit": { "message": "m", "author": { "date": date } }, "files": files })
    }

    fn source_for(server: &MockServer) -> GitHubSource {
        let client = GitHubClient::new(&server.uri(), "t").unwrap();
        GitHubSource::new(client, "acme", OwnerKind::Organization)
    }

    #[tokio::test]
    async fn test_all_branches_dedupes_shared_commits() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/network/branches"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "name": "main" }, { "name": "dev" }])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/network/commits"))
            .and(query_param("sha", "main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([summary(SHA_A, "2024-03-01T10:00:00Z", "Add vpc")])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/network/commits"))
            .and(query_param("sha", "dev"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                summary(SHA_B, "2024-03-02T10:00:00Z", "Tune subnets"),
                summary(SHA_A, "2024-03-01T10:00:00Z", "Add vpc")
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/network/commits/{SHA_A}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail(SHA_A, "2024-03-01T10:00:00Z", &["main.tf"])))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/network/commits/{SHA_B}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(detail(SHA_B, "2024-03-02T10:00:00Z", &["subnets.tf", "README.md"])))
            .mount(&server)
            .await;

        let mut source = source_for(&server);
        let commits = source.commits_in_window(&network_repo(), &window(), None).await.unwrap();

        assert_eq!(commits.len(), 2);
        assert_eq!(commits[0].id(), SHA_A);
        assert_eq!(commits[0].branch(), "main");
        assert_eq!(commits[0].files(), ["main.tf"]);
        assert_eq!(commits[1].branch(), "dev");
        assert_eq!(commits[1].files(), ["subnets.tf", "README.md"]);
    }

    #[tokio::test]
    async fn test_excluded_commit_skips_detail_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/network/commits"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([summary(SHA_C, "2024-05-01T00:00:00Z", "Bump [skip ci]")])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/repos/acme/network/commits/{SHA_C}")))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let mut source = source_for(&server);
        let commits = source.commits_in_window(&network_repo(), &window(), Some("main")).await.unwrap();

        assert_eq!(commits.len(), 1);
        assert!(commits[0].files().is_empty());
        assert_eq!(commits[0].branch(), "main");
    }

    #[tokio::test]
    async fn test_bad_branch_is_recoverable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/acme/network/commits"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "No commit found for SHA: nope" })))
            .mount(&server)
            .await;

        let mut source = source_for(&server);
        let err = source.commits_in_window(&network_repo(), &window(), Some("nope")).await.unwrap_err();

        assert!(!err.is_fatal());
        assert!(matches!(err, AnalysisError::RepositoryFetch { ref repo, .. } if repo == "network"));
    }

    #[tokio::test]
    async fn test_listing_failure_is_access_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(422))
            .mount(&server)
            .await;

        let mut source = source_for(&server);
        let err = source.list_repositories().await.unwrap_err();
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_listing_maps_descriptors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/repositories"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total_count": 1,
                "items": [{ "name": "modules", "private": false, "clone_url": "https://github.com/acme/modules.git" }]
            })))
            .mount(&server)
            .await;

        let mut source = source_for(&server);
        let repos = source.list_repositories().await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "modules");
        assert_eq!(repos[0].default_branch, FALLBACK_DEFAULT_BRANCH);
        assert_eq!(repos[0].locator, "https://github.com/acme/modules.git");
    }
}
