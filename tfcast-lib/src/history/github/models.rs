//! Subset of the GitHub REST API payloads the sources consume.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SearchResponse<T> {
    pub total_count: u64,
    pub items: Vec<T>,
}

#[derive(Debug, Deserialize)]
pub struct Repo {
    pub name: String,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
    pub clone_url: String,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct Branch {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitInfo,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
    pub sha: String,
    pub commit: CommitInfo,
    #[serde(default)]
    pub files: Vec<CommitFile>,
}

#[derive(Debug, Deserialize)]
pub struct CommitInfo {
    pub message: String,
    #[serde(default)]
    pub author: Option<GitActor>,
    #[serde(default)]
    pub committer: Option<GitActor>,
}

impl CommitInfo {
    /// Authored date, falling back to the committer date.
    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.author
            .as_ref()
            .and_then(|a| a.date)
            .or_else(|| self.committer.as_ref().and_then(|c| c.date))
    }
}

#[derive(Debug, Deserialize)]
pub struct GitActor {
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct CommitFile {
    pub filename: String,
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_commit_detail_deserializes() {
        let json = r#"{
            "sha": "abc123",
            "commit": {
                "message": "Add vpc\n\nLonger body [skip ci]",
                "author": { "name": "dev", "date": "2024-04-02T10:11:12Z" },
                "committer": { "name": "dev", "date": "2024-04-03T00:00:00Z" }
            },
            "files": [ { "filename": "vpc/main.tf", "status": "added" } ]
        }"#;

        let detail: CommitDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.sha, "abc123");
        assert!(detail.commit.message.starts_with("Add vpc\n"));
        assert_eq!(detail.commit.date().unwrap().date_naive().to_string(), "2024-04-02");
        assert_eq!(detail.files.len(), 1);
        assert_eq!(detail.files[0].filename, "vpc/main.tf");
    }

    #[test]
    fn test_commit_date_falls_back_to_committer() {
        let json = r#"{ "message": "m", "author": null, "committer": { "date": "2024-04-03T00:00:00Z" } }"#;
        let info: CommitInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.date().unwrap().date_naive().to_string(), "2024-04-03");
    }
}
