//! A release interpreter that logs effects without executing them.
//!
//! Used when `NIGHTLY_DEPLOY_DRY_RUN` is set, so the full pipeline (asset
//! discovery, ordering, content types) can be exercised in CI without
//! touching the real release.
//!
//! # Responses
//!
//! - `GetReleaseByTag`: `ReleaseNotFound`, so the run takes the creation path
//! - `DeleteRelease`: `Deleted`
//! - `CreateRelease`: a placeholder release with id 0 echoing the name/body
//! - `UploadAsset`: `Uploaded`

use std::convert::Infallible;
use std::future::Future;

use tracing::info;

use crate::effects::{ReleaseEffect, ReleaseInterpreter, ReleaseResponse};
use crate::types::{ReleaseData, ReleaseId, RepoId};

#[derive(Debug, Clone)]
pub struct DryRunInterpreter {
    repo: RepoId,
}

impl DryRunInterpreter {
    pub fn new(repo: RepoId) -> Self {
        DryRunInterpreter { repo }
    }

    fn placeholder_upload_url(&self) -> String {
        format!(
            "https://uploads.github.com/repos/{}/releases/0/assets{{?name,label}}",
            self.repo
        )
    }
}

impl ReleaseInterpreter for DryRunInterpreter {
    type Error = Infallible;

    fn interpret(
        &self,
        effect: ReleaseEffect,
    ) -> impl Future<Output = Result<ReleaseResponse, Self::Error>> + Send {
        let rendered = serde_json::to_string(&effect).unwrap_or_else(|_| format!("{:?}", effect));
        info!(repo = %self.repo, effect = %rendered, "Dry run: {} not executed", effect.operation());

        let response = match effect {
            ReleaseEffect::GetReleaseByTag { .. } => ReleaseResponse::ReleaseNotFound,
            ReleaseEffect::DeleteRelease { .. } => ReleaseResponse::Deleted,
            ReleaseEffect::CreateRelease { name, body, .. } => {
                ReleaseResponse::Release(ReleaseData {
                    id: ReleaseId(0),
                    name: Some(name),
                    body: Some(body),
                    upload_url: self.placeholder_upload_url(),
                })
            }
            ReleaseEffect::UploadAsset { .. } => ReleaseResponse::Uploaded,
        };

        async move { Ok(response) }
    }
}
