//! Owner identity type.

use serde::{Deserialize, Serialize};
use strum::Display;

/// The kind of owner whose repositories are analyzed.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OwnerKind {
    Organization,
    User,

    /// A directory of local working trees.
    Local,
}

/// The organization, user or directory whose repositories are analyzed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Owner {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: OwnerKind,
}

impl Owner {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: OwnerKind) -> Self {
        Self { name: name.into(), kind }
    }
}
