//! Release effect interpreter using octocrab.
//!
//! Each effect maps onto one REST call. Failures are categorised through
//! `GitHubApiError`; the only one turned into a regular response is a 404
//! on the tag lookup.

use tracing::{debug, instrument};

use crate::effects::{AssetBytes, ReleaseEffect, ReleaseInterpreter, ReleaseResponse};
use crate::types::{ReleaseData, ReleaseId};

use super::client::OctocrabClient;
use super::error::{GitHubApiError, GitHubErrorKind};

impl ReleaseInterpreter for OctocrabClient {
    type Error = GitHubApiError;

    async fn interpret(&self, effect: ReleaseEffect) -> Result<ReleaseResponse, Self::Error> {
        interpret_release_effect(self, effect).await
    }
}

/// Executes a single release effect against the GitHub API.
pub async fn interpret_release_effect(
    client: &OctocrabClient,
    effect: ReleaseEffect,
) -> Result<ReleaseResponse, GitHubApiError> {
    match effect {
        ReleaseEffect::GetReleaseByTag { tag } => get_release_by_tag(client, tag).await,
        ReleaseEffect::DeleteRelease { id } => delete_release(client, id).await,
        ReleaseEffect::CreateRelease {
            tag,
            target_commitish,
            name,
            body,
            draft,
            prerelease,
        } => {
            create_release(
                client,
                CreateRequest {
                    tag,
                    target_commitish,
                    name,
                    body,
                    draft,
                    prerelease,
                },
            )
            .await
        }
        ReleaseEffect::UploadAsset {
            upload_url,
            name,
            content_type,
            data,
            ..
        } => upload_asset(client, &upload_url, &name, &content_type, data).await,
    }
}

fn release_data(release: octocrab::models::repos::Release) -> ReleaseData {
    ReleaseData {
        id: ReleaseId(release.id.into_inner()),
        name: release.name,
        body: release.body,
        upload_url: release.upload_url,
    }
}

// ─── Releases ─────────────────────────────────────────────────────────────────

async fn get_release_by_tag(
    client: &OctocrabClient,
    tag: String,
) -> Result<ReleaseResponse, GitHubApiError> {
    let result = client
        .inner()
        .repos(client.owner(), client.repo_name())
        .releases()
        .get_by_tag(&tag)
        .await;

    match result {
        Ok(release) => Ok(ReleaseResponse::Release(release_data(release))),
        Err(e) => {
            let err = GitHubApiError::from_octocrab(e);
            if err.is_not_found() {
                debug!(tag = %tag, "No release for tag");
                Ok(ReleaseResponse::ReleaseNotFound)
            } else {
                Err(err)
            }
        }
    }
}

async fn delete_release(
    client: &OctocrabClient,
    id: ReleaseId,
) -> Result<ReleaseResponse, GitHubApiError> {
    client
        .inner()
        .repos(client.owner(), client.repo_name())
        .releases()
        .delete(id.0)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(ReleaseResponse::Deleted)
}

struct CreateRequest {
    tag: String,
    target_commitish: String,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

async fn create_release(
    client: &OctocrabClient,
    request: CreateRequest,
) -> Result<ReleaseResponse, GitHubApiError> {
    let release = client
        .inner()
        .repos(client.owner(), client.repo_name())
        .releases()
        .create(&request.tag)
        .target_commitish(&request.target_commitish)
        .name(&request.name)
        .body(&request.body)
        .draft(request.draft)
        .prerelease(request.prerelease)
        .send()
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(ReleaseResponse::Release(release_data(release)))
}

// ─── Assets ───────────────────────────────────────────────────────────────────

/// Builds the concrete upload URI from a release's `upload_url`.
///
/// GitHub returns the endpoint as a URI template such as
/// `https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}`;
/// the template part is dropped and `name` is appended percent-encoded.
///
/// This is a pure function extracted for testability.
pub fn asset_upload_uri(upload_url: &str, name: &str) -> String {
    let base = match upload_url.find('{') {
        Some(idx) => &upload_url[..idx],
        None => upload_url,
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{}{}name={}", base, separator, urlencoding::encode(name))
}

#[instrument(skip(client, upload_url, data))]
async fn upload_asset(
    client: &OctocrabClient,
    upload_url: &str,
    name: &str,
    content_type: &str,
    data: AssetBytes,
) -> Result<ReleaseResponse, GitHubApiError> {
    let uri = asset_upload_uri(upload_url, name);
    let data = data.into_inner();

    // The release's upload endpoint takes the raw file body; octocrab's
    // JSON helpers don't apply here.
    let request = http::Request::builder()
        .method(http::Method::POST)
        .uri(uri.as_str())
        .header(http::header::CONTENT_TYPE, content_type)
        .header(http::header::CONTENT_LENGTH, data.len())
        .body(data)
        .map_err(|e| {
            GitHubApiError::without_source(
                GitHubErrorKind::Other,
                format!("invalid upload request for {}: {}", name, e),
            )
        })?;

    let response = client
        .inner()
        .execute(request)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    octocrab::map_github_error(response)
        .await
        .map_err(GitHubApiError::from_octocrab)?;

    Ok(ReleaseResponse::Uploaded)
}
