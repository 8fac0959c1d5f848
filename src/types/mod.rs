//! Core domain types for the nightly deploy pipeline.

pub mod ids;
pub mod release;

pub use ids::{ReleaseId, RepoId};
pub use release::{DEFAULT_RELEASE_TEXT, ReleaseData, ReleaseDraft};
