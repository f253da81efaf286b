//! GitHub-backed repository discovery and commit history.

mod client;
mod models;
mod source;

pub use client::{DEFAULT_API_URL, GitHubClient};
pub use source::{GitHubSource, discover_repositories};
