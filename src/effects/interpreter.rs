//! Effect interpreter trait.
//!
//! Implementations:
//! - `OctocrabClient` executes effects against the GitHub API
//! - `DryRunInterpreter` logs effects and fabricates responses
//! - a recording mock in the test utilities

use std::future::Future;

use super::release::{ReleaseEffect, ReleaseResponse};

/// Interprets release effects against a release-hosting API.
///
/// Implementations are constructed with a `RepoId`, so all effects executed
/// through a single interpreter instance are scoped to that repository.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct NotFoundInterpreter;
///
/// impl ReleaseInterpreter for NotFoundInterpreter {
///     type Error = String;
///
///     async fn interpret(&self, effect: ReleaseEffect) -> Result<ReleaseResponse, Self::Error> {
///         match effect {
///             ReleaseEffect::GetReleaseByTag { .. } => Ok(ReleaseResponse::ReleaseNotFound),
///             other => Err(format!("unexpected effect: {:?}", other)),
///         }
///     }
/// }
/// ```
pub trait ReleaseInterpreter {
    /// The error type returned by this interpreter.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Execute a release effect and return its response.
    ///
    /// A missing release on `GetReleaseByTag` is reported as
    /// `ReleaseResponse::ReleaseNotFound`, not as an error.
    fn interpret(
        &self,
        effect: ReleaseEffect,
    ) -> impl Future<Output = Result<ReleaseResponse, Self::Error>> + Send;
}
