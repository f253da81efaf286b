//! Decides which commits count as infrastructure activity.

use crate::history::CommitRecord;
use chrono::NaiveDate;

/// Path suffixes that mark a file as infrastructure-as-code.
pub const INFRA_SUFFIXES: [&str; 3] = [".tf", ".tfvars", ".tfvars.json"];

/// Marker that excludes a commit when found anywhere in its message, in any case.
pub const CONTROL_MARKER: &str = "[skip ci]";

/// A qualifying commit, reduced to its infrastructure files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilteredCommit {
    pub id: String,
    pub date: NaiveDate,
    pub branch: String,
    pub files: Vec<String>,
}

/// Returns `true` when `path` ends with one of the [`INFRA_SUFFIXES`].
///
/// The match is case-sensitive and applies to the whole path.
#[must_use]
pub fn is_infra_file(path: &str) -> bool {
    INFRA_SUFFIXES.iter().any(|suffix| path.ends_with(suffix))
}

/// Returns `true` when a commit message carries the [`CONTROL_MARKER`].
#[must_use]
pub fn is_excluded(message: &str) -> bool {
    message.to_lowercase().contains(CONTROL_MARKER)
}

/// Reduce a commit to its infrastructure files.
///
/// Returns `None` for excluded commits and for commits that touched no infrastructure file.
#[must_use]
pub fn classify(commit: &CommitRecord) -> Option<FilteredCommit> {
    if is_excluded(commit.message()) {
        return None;
    }

    let files: Vec<String> = commit.files().iter().filter(|f| is_infra_file(f)).cloned().collect();
    if files.is_empty() {
        return None;
    }

    Some(FilteredCommit {
        id: commit.id().to_string(),
        date: commit.date(),
        branch: commit.branch().to_string(),
        files,
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    fn commit(message: &str, files: &[&str]) -> CommitRecord {
        CommitRecord::new(
            "abc",
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            message,
            files.iter().map(ToString::to_string).collect(),
            "main",
        )
        .unwrap()
    }

    #[test]
    fn test_infra_suffixes() {
        assert!(is_infra_file("main.tf"));
        assert!(is_infra_file("env/prod.tfvars"));
        assert!(is_infra_file("env/prod.tfvars.json"));
        assert!(is_infra_file("modules/vpc/variables.tf"));
    }

    #[test]
    fn test_non_infra_paths() {
        assert!(!is_infra_file("main.tf.bak"));
        assert!(!is_infra_file("README.md"));
        assert!(!is_infra_file("settings.json"));
        assert!(!is_infra_file("terraform.lock.hcl"));
    }

    #[test]
    fn test_suffix_match_is_case_sensitive() {
        assert!(!is_infra_file("MAIN.TF"));
        assert!(!is_infra_file("prod.TFVARS"));
    }

    #[test]
    fn test_control_marker_any_case() {
        assert!(is_excluded("Bump versions [skip ci]"));
        assert!(is_excluded("[SKIP CI] regenerate docs"));
        assert!(is_excluded("chore: [Skip Ci]"));
        assert!(!is_excluded("skip ci"));
        assert!(!is_excluded("Add vpc"));
    }

    #[test]
    fn test_classify_excluded_commit() {
        assert_eq!(classify(&commit("Update [SKIP CI]", &["main.tf"])), None);
    }

    #[test]
    fn test_classify_keeps_only_infra_files() {
        let filtered = classify(&commit("Add vpc", &["readme.md", "main.tf"])).unwrap();
        assert_eq!(filtered.files, ["main.tf"]);
        assert_eq!(filtered.id, "abc");
        assert_eq!(filtered.branch, "main");
    }

    #[test]
    fn test_classify_without_infra_files() {
        assert_eq!(classify(&commit("Docs", &["readme.md"])), None);
        assert_eq!(classify(&commit("Empty", &[])), None);
    }
}
