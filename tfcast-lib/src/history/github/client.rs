//! Minimal GitHub REST client that honors the provider's rate budget.

use super::models::{Branch, CommitDetail, CommitSummary, Repo, SearchResponse};
use crate::AnalysisError;
use crate::Result;
use crate::history::owner::OwnerKind;
use crate::history::rate_budget::RateBudget;
use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use reqwest::header::{ACCEPT, HeaderMap, HeaderName, HeaderValue, USER_AGENT};
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

const LOG_TARGET: &str = "github";

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Primary language GitHub reports for Terraform repositories.
const INFRA_LANGUAGE: &str = "hcl";

const PER_PAGE: usize = 100;

/// The search API never returns more than this many results for a query.
const SEARCH_RESULT_CAP: u64 = 1000;

/// Attempts made for a call rejected because the budget ran out mid-flight.
const MAX_RATE_LIMITED_ATTEMPTS: u32 = 3;

const RATE_REMAINING_HEADER: &str = "x-ratelimit-remaining";
const RATE_RESET_HEADER: &str = "x-ratelimit-reset";

/// GitHub keeps separate budgets for search and for everything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Core,
    Search,
}

#[derive(Debug)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    token: String,
    core_budget: RateBudget,
    search_budget: RateBudget,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: impl Into<String>) -> Result<Self> {
        let mut api_url = Url::parse(api_url).with_context(|| format!("parsing GitHub API URL '{api_url}'"))?;
        if !api_url.path().ends_with('/') {
            let path = format!("{}/", api_url.path());
            api_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        let _ = headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        let _ = headers.insert(HeaderName::from_static("x-github-api-version"), HeaderValue::from_static("2022-11-28"));
        let _ = headers.insert(USER_AGENT, HeaderValue::from_static(concat!("tfcast/", env!("CARGO_PKG_VERSION"))));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .context("building HTTP client")?;

        Ok(Self {
            http,
            api_url,
            token: token.into(),
            core_budget: RateBudget::default(),
            search_budget: RateBudget::default(),
        })
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub const fn core_budget(&self) -> &RateBudget {
        &self.core_budget
    }

    const fn budget_mut(&mut self, resource: Resource) -> &mut RateBudget {
        match resource {
            Resource::Core => &mut self.core_budget,
            Resource::Search => &mut self.search_budget,
        }
    }

    /// Determine whether `owner` is an organization or a user.
    ///
    /// Organization lookup is attempted first. Failure to resolve the owner at all, or a
    /// rejected credential, is an access error.
    pub async fn resolve_owner(&mut self, owner: &str) -> Result<OwnerKind, AnalysisError> {
        for (path, kind) in [(format!("orgs/{owner}"), OwnerKind::Organization), (format!("users/{owner}"), OwnerKind::User)] {
            let response = self
                .send(Resource::Core, &path, &[])
                .await
                .map_err(|e| AnalysisError::Access(format!("{e:#}")))?;

            match response.status() {
                status if status.is_success() => {
                    log::info!(target: LOG_TARGET, "Resolved '{owner}' as {kind}");
                    return Ok(kind);
                }
                StatusCode::NOT_FOUND => continue,
                StatusCode::UNAUTHORIZED => {
                    return Err(AnalysisError::Access("GitHub rejected the credential (bad credentials)".to_string()));
                }
                status => {
                    return Err(AnalysisError::Access(format!("GitHub returned {status} while looking up '{owner}'")));
                }
            }
        }

        Err(AnalysisError::Access(format!("owner '{owner}' not found as an organization or a user")))
    }

    /// Search the owner's repositories whose primary language is the infrastructure language,
    /// most recently updated first.
    pub async fn search_repositories(&mut self, owner: &str, kind: OwnerKind) -> Result<Vec<Repo>> {
        let qualifier = if kind == OwnerKind::Organization { "org" } else { "user" };
        let query = format!("{qualifier}:{owner} language:{INFRA_LANGUAGE}");

        let mut repos = Vec::new();
        for page in 1.. {
            let params = [
                ("q", query.clone()),
                ("sort", "updated".to_string()),
                ("order", "desc".to_string()),
                ("per_page", PER_PAGE.to_string()),
                ("page", page.to_string()),
            ];

            let response: SearchResponse<Repo> = self.get_json(Resource::Search, "search/repositories", &params).await?;
            let received = response.items.len();
            repos.extend(response.items);

            let total = response.total_count.min(SEARCH_RESULT_CAP);
            if received < PER_PAGE || repos.len() as u64 >= total {
                break;
            }
        }

        log::debug!(target: LOG_TARGET, "Search '{query}' returned {} repositories", repos.len());
        Ok(repos)
    }

    pub async fn list_branches(&mut self, owner: &str, repo: &str) -> Result<Vec<String>> {
        let branches: Vec<Branch> = self.get_all_pages(&format!("repos/{owner}/{repo}/branches"), &[]).await?;
        Ok(branches.into_iter().map(|b| b.name).collect())
    }

    /// List commits reachable from `branch` (or the default branch) between `since` and `until`.
    ///
    /// An empty repository yields no commits rather than an error.
    pub async fn list_commits(
        &mut self,
        owner: &str,
        repo: &str,
        branch: Option<&str>,
        since: NaiveDate,
        until: NaiveDate,
    ) -> Result<Vec<CommitSummary>> {
        let path = format!("repos/{owner}/{repo}/commits");
        let mut params = vec![("since", format!("{since}T00:00:00Z")), ("until", format!("{until}T00:00:00Z"))];
        if let Some(branch) = branch {
            params.push(("sha", branch.to_string()));
        }

        match self.get_all_pages(&path, &params).await {
            Ok(commits) => Ok(commits),
            Err(e) if e.downcast_ref::<StatusError>().is_some_and(|s| s.status == StatusCode::CONFLICT) => {
                log::debug!(target: LOG_TARGET, "Repository '{owner}/{repo}' is empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn commit_detail(&mut self, owner: &str, repo: &str, sha: &str) -> Result<CommitDetail> {
        self.get_json(Resource::Core, &format!("repos/{owner}/{repo}/commits/{sha}"), &[]).await
    }

    async fn get_all_pages<T: DeserializeOwned>(&mut self, path: &str, params: &[(&str, String)]) -> Result<Vec<T>> {
        let mut items = Vec::new();
        for page in 1.. {
            let mut page_params = params.to_vec();
            page_params.push(("per_page", PER_PAGE.to_string()));
            page_params.push(("page", page.to_string()));

            let batch: Vec<T> = self.get_json(Resource::Core, path, &page_params).await?;
            let received = batch.len();
            items.extend(batch);

            if received < PER_PAGE {
                break;
            }
        }
        Ok(items)
    }

    async fn get_json<T: DeserializeOwned>(&mut self, resource: Resource, path: &str, params: &[(&str, String)]) -> Result<T> {
        let response = self.send(resource, path, params).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StatusError {
                status,
                path: path.to_string(),
                message: body.chars().take(200).collect(),
            }
            .into());
        }

        response.json().await.with_context(|| format!("decoding response from '{path}'"))
    }

    /// Issue a GET, waiting first if the budget for `resource` is exhausted.
    ///
    /// A call rejected because the budget ran out is retried after the reset.
    async fn send(&mut self, resource: Resource, path: &str, params: &[(&str, String)]) -> Result<Response> {
        let url = self.api_url.join(path).with_context(|| format!("building URL for '{path}'"))?;

        let mut attempt = 1;
        loop {
            self.budget_mut(resource).wait_if_exhausted().await;

            log::trace!(target: LOG_TARGET, "GET {url}");
            let response = self
                .http
                .get(url.clone())
                .query(params)
                .bearer_auth(&self.token)
                .send()
                .await
                .with_context(|| format!("requesting '{path}'"))?;

            if let Some((remaining, reset_at)) = parse_rate_headers(response.headers()) {
                self.budget_mut(resource).update(remaining, reset_at);
            }

            let rate_limited = matches!(response.status(), StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
                && self.budget_mut(resource).is_exhausted();

            if rate_limited && attempt < MAX_RATE_LIMITED_ATTEMPTS {
                attempt += 1;
                continue;
            }

            return Ok(response);
        }
    }
}

/// Non-success HTTP status for an API call.
#[derive(Debug)]
pub struct StatusError {
    pub status: StatusCode,
    pub path: String,
    pub message: String,
}

impl core::fmt::Display for StatusError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "GitHub returned {} for '{}'", self.status, self.path)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl core::error::Error for StatusError {}

/// Extract the remaining call count and reset time from response headers.
fn parse_rate_headers(headers: &HeaderMap) -> Option<(u64, DateTime<Utc>)> {
    let header = |name: &str| headers.get(name)?.to_str().ok()?.trim().parse::<i64>().ok();

    let remaining = u64::try_from(header(RATE_REMAINING_HEADER)?).ok()?;
    let reset_at = DateTime::from_timestamp(header(RATE_RESET_HEADER)?, 0)?;
    Some((remaining, reset_at))
}
