use super::commit_record::{CommitRecord, UNKNOWN_BRANCH};
use super::git;
use super::repository::RepositoryDescriptor;
use super::window::AnalysisWindow;
use super::{HistorySource, repository_error};
use crate::AnalysisError;
use crate::Result;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};

const LOG_TARGET: &str = "local";

/// History read in place from git working trees on disk.
///
/// The root is either a working tree itself or a directory whose immediate subdirectories
/// are working trees.
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: Utf8PathBuf,
}

impl LocalSource {
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn working_trees(&self) -> Result<Vec<Utf8PathBuf>> {
        if is_working_tree(&self.root) {
            return Ok(vec![self.root.clone()]);
        }

        let mut trees = Vec::new();
        for entry in self.root.read_dir_utf8().with_context(|| format!("reading directory '{}'", self.root))? {
            let entry = entry.with_context(|| format!("reading directory '{}'", self.root))?;
            if is_working_tree(entry.path()) {
                trees.push(entry.path().to_path_buf());
            }
        }

        trees.sort();
        Ok(trees)
    }
}

fn is_working_tree(path: &Utf8Path) -> bool {
    path.join(".git").exists()
}

fn repository_name(path: &Utf8Path) -> String {
    path.file_name().map_or_else(|| path.to_string(), ToString::to_string)
}

impl HistorySource for LocalSource {
    async fn list_repositories(&mut self) -> Result<Vec<RepositoryDescriptor>, AnalysisError> {
        let trees = self
            .working_trees()
            .map_err(|e| AnalysisError::Access(format!("listing repositories under '{}': {e:#}", self.root)))?;

        let mut repos = Vec::with_capacity(trees.len());
        for path in trees {
            let default_branch = match git::current_branch(path.as_std_path()).await {
                Ok(branch) => branch,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Could not determine the current branch of '{path}': {e:#}");
                    UNKNOWN_BRANCH.to_string()
                }
            };

            repos.push(RepositoryDescriptor {
                name: repository_name(&path),
                default_branch,
                private: true,
                locator: path.to_string(),
                updated_at: None,
            });
        }

        log::info!(target: LOG_TARGET, "Found {} working trees under '{}'", repos.len(), self.root);
        Ok(repos)
    }

    async fn commits_in_window(
        &mut self,
        repo: &RepositoryDescriptor,
        window: &AnalysisWindow,
        branch: Option<&str>,
    ) -> Result<Vec<CommitRecord>, AnalysisError> {
        let path = Utf8Path::new(&repo.locator);
        git::infra_log(path.as_std_path(), window, branch, branch.unwrap_or(UNKNOWN_BRANCH))
            .await
            .map_err(|e| repository_error(&repo.name, &e))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::fs;

    fn utf8(path: &std::path::Path) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(path.to_path_buf()).unwrap()
    }

    #[tokio::test]
    async fn test_lists_working_trees_sorted() {
        let root = tempfile::tempdir().unwrap();
        for name in ["zeta", "alpha"] {
            fs::create_dir_all(root.path().join(name).join(".git")).unwrap();
        }
        fs::create_dir_all(root.path().join("not-a-repo")).unwrap();

        let mut source = LocalSource::new(utf8(root.path()));
        let repos = source.list_repositories().await.unwrap();

        let names: Vec<_> = repos.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["alpha", "zeta"]);
        assert!(repos.iter().all(|r| r.private));
    }

    #[tokio::test]
    async fn test_root_that_is_a_working_tree() {
        let root = tempfile::tempdir().unwrap();
        let tree = root.path().join("infra");
        fs::create_dir_all(tree.join(".git")).unwrap();

        let mut source = LocalSource::new(utf8(&tree));
        let repos = source.list_repositories().await.unwrap();
        assert_eq!(repos.len(), 1);
        assert_eq!(repos[0].name, "infra");
    }

    #[tokio::test]
    async fn test_missing_root_is_access_error() {
        let root = tempfile::tempdir().unwrap();
        let mut source = LocalSource::new(utf8(&root.path().join("missing")));
        let err = source.list_repositories().await.unwrap_err();
        assert!(matches!(err, AnalysisError::Access(_)));
    }

    #[tokio::test]
    async fn test_log_failure_is_traversal_error() {
        let root = tempfile::tempdir().unwrap();
        // a bogus .git directory makes git log exit non-zero
        let tree = root.path().join("broken");
        fs::create_dir_all(tree.join(".git")).unwrap();

        let mut source = LocalSource::new(utf8(root.path()));
        let repos = source.list_repositories().await.unwrap();
        let window = AnalysisWindow::trailing(chrono::Utc::now().date_naive(), 30);
        let err = source.commits_in_window(&repos[0], &window, None).await.unwrap_err();

        assert!(matches!(err, AnalysisError::Traversal { ref repo, .. } if repo == "broken"));
        assert!(!err.is_fatal());
    }
}
