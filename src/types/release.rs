//! Release types shared between the orchestrator and the interpreters.

use serde::{Deserialize, Serialize};

use super::ids::ReleaseId;

/// Name and body used when no previous release exists for the tag.
pub const DEFAULT_RELEASE_TEXT: &str = "nightly builds";

/// A release as returned by the hosting API.
///
/// Only the fields the deploy pipeline reads are kept. GitHub allows both
/// `name` and `body` to be null.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseData {
    pub id: ReleaseId,
    pub name: Option<String>,
    pub body: Option<String>,
    /// Upload endpoint for assets, possibly still carrying its URI template
    /// suffix (`{?name,label}`).
    pub upload_url: String,
}

/// The human-facing content of a release, carried across delete/recreate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseDraft {
    pub name: String,
    pub body: String,
}

impl ReleaseDraft {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        ReleaseDraft {
            name: name.into(),
            body: body.into(),
        }
    }

    /// Draft for a tag that has never been released.
    pub fn nightly_default() -> Self {
        Self::new(DEFAULT_RELEASE_TEXT, DEFAULT_RELEASE_TEXT)
    }

    /// Captures the content of an existing release so it survives recreation.
    ///
    /// Null fields are carried as empty strings, not replaced by the default.
    pub fn from_existing(release: &ReleaseData) -> Self {
        Self::new(
            release.name.clone().unwrap_or_default(),
            release.body.clone().unwrap_or_default(),
        )
    }
}
