use chrono::{DateTime, Utc};
use core::fmt::{Display, Formatter, Result as FmtResult};
use serde::Serialize;

/// A repository discovered by a history source's listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepositoryDescriptor {
    pub name: String,
    pub default_branch: String,
    pub private: bool,

    /// Where the repository can be reached: a clone URL or a local path.
    pub locator: String,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Display for RepositoryDescriptor {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.name)
    }
}
