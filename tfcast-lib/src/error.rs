//! Error taxonomy for an analysis run.

use thiserror::Error;

/// Errors surfaced at component boundaries.
///
/// `Configuration` and `Access` are fatal and abort the run. `RepositoryFetch` and `Traversal`
/// are absorbed by the orchestrator at the repository boundary: the repository is recorded as
/// failed and contributes nothing to the aggregate.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Required configuration is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The owner could not be resolved or the credential was rejected.
    #[error("access error: {0}")]
    Access(String),

    /// A single repository's history could not be obtained.
    #[error("could not fetch history for repository '{repo}': {reason}")]
    RepositoryFetch { repo: String, reason: String },

    /// The history traversal command exited unsuccessfully.
    #[error("history traversal failed for repository '{repo}': {reason}")]
    Traversal { repo: String, reason: String },
}

impl AnalysisError {
    /// Returns `true` for errors that must terminate the run.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_) | Self::Access(_))
    }

    pub(crate) fn fetch(repo: &str, err: &anyhow::Error) -> Self {
        Self::RepositoryFetch {
            repo: repo.to_string(),
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(AnalysisError::Configuration("missing token".into()).is_fatal());
        assert!(AnalysisError::Access("owner not found".into()).is_fatal());
        assert!(
            !AnalysisError::RepositoryFetch {
                repo: "infra".into(),
                reason: "404".into()
            }
            .is_fatal()
        );
        assert!(
            !AnalysisError::Traversal {
                repo: "infra".into(),
                reason: "exit 128".into()
            }
            .is_fatal()
        );
    }

    #[test]
    fn test_fetch_keeps_context_chain() {
        let err = anyhow::anyhow!("HTTP 404").context("listing commits");
        let fetch = AnalysisError::fetch("network", &err);
        let msg = fetch.to_string();
        assert!(msg.contains("network"));
        assert!(msg.contains("listing commits"));
        assert!(msg.contains("HTTP 404"));
    }
}
