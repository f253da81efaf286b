use crate::Result;
use anyhow::bail;
use chrono::NaiveDate;
use serde::Serialize;

/// Branch attributed to a commit when the source traversed all refs at once.
pub const UNKNOWN_BRANCH: &str = "unknown";

/// A normalized commit, independent of the source that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitRecord {
    id: String,
    date: NaiveDate,
    message: String,
    files: Vec<String>,
    branch: String,
}

impl CommitRecord {
    /// Build a commit record, validating the required fields.
    ///
    /// An empty `branch` is normalized to [`UNKNOWN_BRANCH`].
    pub fn new(
        id: impl Into<String>,
        date: NaiveDate,
        message: impl Into<String>,
        files: Vec<String>,
        branch: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            bail!("commit identifier must not be empty");
        }

        let mut branch = branch.into();
        if branch.trim().is_empty() {
            branch = UNKNOWN_BRANCH.to_string();
        }

        Ok(Self {
            id,
            date,
            message: message.into(),
            files,
            branch,
        })
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub const fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Changed file paths, in the order the source reported them.
    #[must_use]
    pub fn files(&self) -> &[String] {
        &self.files
    }

    #[must_use]
    pub fn branch(&self) -> &str {
        &self.branch
    }
}
