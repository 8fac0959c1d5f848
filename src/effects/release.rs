//! Release API effect types.
//!
//! These describe release-hosting operations as data. Interpreters execute
//! them against GitHub (or just log them); the deploy pipeline only ever
//! produces effects and consumes responses.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{ReleaseData, ReleaseId};

/// Raw asset contents.
///
/// Wrapped so that logging an effect prints the size, not the bytes.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct AssetBytes(pub Vec<u8>);

impl AssetBytes {
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl fmt::Debug for AssetBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{} bytes>", self.0.len())
    }
}

impl From<Vec<u8>> for AssetBytes {
    fn from(data: Vec<u8>) -> Self {
        AssetBytes(data)
    }
}

/// A release API effect.
///
/// Effects are repo-scoped: the interpreter is constructed with a `RepoId`,
/// so effects don't include it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReleaseEffect {
    /// Look up the release attached to a tag.
    GetReleaseByTag { tag: String },

    /// Delete a release. The tag itself is left in place.
    DeleteRelease { id: ReleaseId },

    /// Create a release for `tag`, creating the tag at `target_commitish`
    /// if it doesn't exist yet.
    CreateRelease {
        tag: String,
        target_commitish: String,
        name: String,
        body: String,
        draft: bool,
        prerelease: bool,
    },

    /// Attach a file to a release through its upload endpoint.
    UploadAsset {
        upload_url: String,
        name: String,
        content_type: String,
        size: u64,
        #[serde(skip)]
        data: AssetBytes,
    },
}

impl ReleaseEffect {
    /// Short operation name for log lines and diagnostics.
    pub fn operation(&self) -> &'static str {
        match self {
            ReleaseEffect::GetReleaseByTag { .. } => "getReleaseByTag",
            ReleaseEffect::DeleteRelease { .. } => "deleteRelease",
            ReleaseEffect::CreateRelease { .. } => "createRelease",
            ReleaseEffect::UploadAsset { .. } => "uploadAsset",
        }
    }
}

/// Response from a release effect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ReleaseResponse {
    /// Response to `GetReleaseByTag` and `CreateRelease`.
    Release(ReleaseData),

    /// Response to `GetReleaseByTag` when no release carries the tag.
    ReleaseNotFound,

    /// Response to `DeleteRelease`.
    Deleted,

    /// Response to `UploadAsset`.
    Uploaded,
}
