//! GitHub release API client and effect interpreter.
//!
//! This module executes release effects via the octocrab library:
//! - lookup, delete and create go through octocrab's release handlers
//! - uploads are raw POSTs to the release's upload endpoint
//! - a 404 on lookup becomes `ReleaseResponse::ReleaseNotFound`

mod client;
mod error;
mod interpreter;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use interpreter::{asset_upload_uri, interpret_release_effect};
