//! `git` command-line plumbing shared by the clone-backed and local history sources.

use super::commit_record::{CommitRecord, UNKNOWN_BRANCH};
use super::window::AnalysisWindow;
use crate::Result;
use anyhow::{Context, bail};
use chrono::NaiveDate;
use core::time::Duration;
use std::collections::HashSet;
use std::path::Path;
use std::process::{Output, Stdio};
use tokio::process::Command;
use url::Url;

const LOG_TARGET: &str = "git";

const GIT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Pathspecs handed to `git log` so only infrastructure files are reported.
pub const INFRA_PATHSPECS: [&str; 3] = ["*.tf", "*.tfvars", "*.tfvars.json"];

const HASH_LEN: usize = 40;
const DATE_LEN: usize = 10;
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Convert a path to a UTF-8 string, returning an error if the path contains invalid UTF-8.
fn path_str(path: &Path) -> Result<&str> {
    path.to_str().context("invalid UTF-8 in repository path")
}

/// Clone a repository into `repo_path`, which must not exist yet.
///
/// `display_url` is what gets logged, so credentials embedded in `repo_url` stay out of logs.
pub async fn clone_repo(repo_path: &Path, repo_url: &Url, display_url: &str) -> Result<()> {
    let start_time = std::time::Instant::now();
    let path_str = path_str(repo_path)?;

    log::info!(target: LOG_TARGET, "Cloning repository '{display_url}'");

    // --filter=blob:none keeps full history and trees, which is all `git log --name-only` needs
    let output = run_git_with_timeout(&["clone", "--filter=blob:none", "--no-tags", "--quiet", repo_url.as_str(), path_str]).await?;

    if let Err(e) = check_git_output(&output, "git clone") {
        // scrub the authenticated URL in case git echoed it back
        bail!("{}", e.to_string().replace(repo_url.as_str(), display_url));
    }

    log::debug!(target: LOG_TARGET, "Cloned '{display_url}' in {:.3}s", start_time.elapsed().as_secs_f64());
    Ok(())
}

/// Resolve the branch HEAD points at, falling back to [`UNKNOWN_BRANCH`] for a detached HEAD.
pub async fn current_branch(repo_path: &Path) -> Result<String> {
    let path_str = path_str(repo_path)?;
    let output = run_git_with_timeout(&["-C", path_str, "rev-parse", "--abbrev-ref", "HEAD"]).await?;
    check_git_output(&output, "git rev-parse")?;

    let branch = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if branch.is_empty() || branch == "HEAD" {
        return Ok(UNKNOWN_BRANCH.to_string());
    }
    Ok(branch)
}

/// Error raised when `git log` itself fails, as opposed to failing to launch.
#[derive(Debug)]
pub struct TraversalFailure(pub String);

impl core::fmt::Display for TraversalFailure {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl core::error::Error for TraversalFailure {}

/// Run `git log` over the infrastructure pathspecs and parse the commits it reports.
///
/// The whole history reachable from `rev` is walked and commits outside `window` are dropped
/// afterwards. With no `rev`, all refs are traversed and commits are attributed to [`UNKNOWN_BRANCH`];
/// otherwise commits are attributed to `branch`. A non-zero exit yields an error whose root
/// cause is a [`TraversalFailure`].
pub async fn infra_log(repo_path: &Path, window: &AnalysisWindow, rev: Option<&str>, branch: &str) -> Result<Vec<CommitRecord>> {
    let path_str = path_str(repo_path)?;

    // the window is applied after parsing; --since would end the walk at the first older commit
    let mut args = vec![
        "-C",
        path_str,
        "log",
        rev.unwrap_or("--all"),
        "--pretty=format:%ad %H %s",
        "--date=format:%Y-%m-%d",
        "--name-only",
        "--",
    ];
    args.extend(INFRA_PATHSPECS);

    let output = run_git_with_timeout(&args).await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TraversalFailure(format!("git log exited with {}: {}", output.status, stderr.trim())).into());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let branch = if rev.is_some() { branch } else { UNKNOWN_BRANCH };
    let commits = parse_log(&stdout, branch)
        .into_iter()
        .filter(|c| window.contains(c.date()))
        .collect();

    Ok(commits)
}

/// A commit header as emitted by `--pretty=format:%ad %H %s`.
#[derive(Debug, PartialEq, Eq)]
struct Header<'a> {
    date: NaiveDate,
    hash: &'a str,
    message: &'a str,
}

/// Recognize a header line.
///
/// A header has a `YYYY-MM-DD` date prefix followed by a 40-character hex hash.
fn parse_header(line: &str) -> Option<Header<'_>> {
    let (date_part, rest) = line.split_once(' ')?;
    if date_part.len() != DATE_LEN {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, DATE_FORMAT).ok()?;

    let (hash, message) = rest.split_once(' ').unwrap_or((rest, ""));
    if hash.len() != HASH_LEN || !hash.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    Some(Header { date, hash, message })
}

/// Parse `git log --name-only` output into commit records.
///
/// Lines following a header up to the next header are that commit's changed files. Commits
/// reachable from several refs are reported once.
fn parse_log(output: &str, branch: &str) -> Vec<CommitRecord> {
    let mut commits = Vec::new();
    let mut seen = HashSet::new();
    let mut current: Option<(Header<'_>, Vec<String>)> = None;

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        if let Some(header) = parse_header(line) {
            if let Some((prev, files)) = current.replace((header, Vec::new())) {
                push_commit(&mut commits, &mut seen, prev, files, branch);
            }
        } else if let Some((_, files)) = current.as_mut() {
            files.push(line.trim().to_string());
        }
    }

    if let Some((prev, files)) = current {
        push_commit(&mut commits, &mut seen, prev, files, branch);
    }

    commits
}

fn push_commit(commits: &mut Vec<CommitRecord>, seen: &mut HashSet<String>, header: Header<'_>, files: Vec<String>, branch: &str) {
    if !seen.insert(header.hash.to_string()) {
        return;
    }

    match CommitRecord::new(header.hash, header.date, header.message, files, branch) {
        Ok(commit) => commits.push(commit),
        Err(e) => log::debug!(target: LOG_TARGET, "Skipping malformed commit '{}': {e:#}", header.hash),
    }
}

fn check_git_output(output: &Output, operation: &str) -> Result<()> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("{operation} failed: {}", stderr.trim());
    }
    Ok(())
}

async fn run_git_with_timeout(args: &[&str]) -> Result<Output> {
    let child = Command::new("git")
        .args(args)
        .env("GIT_TERMINAL_PROMPT", "0")
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .context("spawning git command")?;

    match tokio::time::timeout(GIT_TIMEOUT, child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(e).with_context(|| format!("running 'git {}'", args.first().unwrap_or(&""))),
        Err(_) => bail!("'git {}' timed out after {} seconds", args.first().unwrap_or(&""), GIT_TIMEOUT.as_secs()),
    }
}
