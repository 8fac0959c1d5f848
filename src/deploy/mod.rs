//! The nightly deploy pipeline.
//!
//! A run moves strictly forward through these stages, with at most one
//! remote call in flight:
//!
//! 1. Filter the candidate assets down to files that exist. None left ends
//!    the run successfully without contacting the API.
//! 2. Require a token and build the interpreter from it.
//! 3. Look up the release for the tag.
//! 4. If one exists, delete it, keeping its name and body.
//! 5. Create a fresh prerelease on the configured branch.
//! 6. Upload each asset in order; the first failure ends the run.
//!
//! Only a missing release on lookup is handled; every other failure is
//! returned as a `DeployError` naming its stage. Nothing is retried or
//! rolled back.

mod error;

pub use error::{DeployError, Stage};

use tracing::info;

use crate::assets::{AssetFile, filter_existing};
use crate::config::DeployConfig;
use crate::effects::{ReleaseEffect, ReleaseInterpreter, ReleaseResponse};
use crate::types::{ReleaseData, ReleaseDraft, ReleaseId};

/// How a run that didn't fail ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployOutcome {
    /// No candidate asset exists on disk; nothing was contacted.
    NothingToUpload,

    /// A release was (re)created and every asset uploaded.
    Published {
        release: ReleaseData,
        /// The release deleted to make room, if there was one.
        replaced: Option<ReleaseId>,
        uploaded: Vec<String>,
    },
}

/// Mutable state threaded through the stages of one run.
#[derive(Debug, Default)]
struct RunContext {
    /// The release created in this run, once it exists.
    release: Option<ReleaseData>,
    replaced: Option<ReleaseId>,
    uploaded: Vec<String>,
}

/// Runs the pipeline for `config`.
///
/// `connect` turns the access token into an interpreter; it is only called
/// once there is something to upload and a token is present.
pub async fn run<I, C>(config: &DeployConfig, connect: C) -> Result<DeployOutcome, DeployError>
where
    I: ReleaseInterpreter,
    C: FnOnce(&str) -> Result<I, I::Error>,
{
    let assets = filter_existing(&config.dir, &config.assets);
    if assets.is_empty() {
        info!(dir = %config.dir.display(), "There are no assets to upload");
        return Ok(DeployOutcome::NothingToUpload);
    }

    let interpreter = authenticate(config, connect)?;
    let mut ctx = RunContext::default();

    let draft = match fetch_release(config, &interpreter).await? {
        Some(existing) => {
            info!(tag = %config.tag, release_id = %existing.id, "Release exists, it will be deleted");
            let draft = ReleaseDraft::from_existing(&existing);
            ctx.replaced = Some(delete_release(&interpreter, existing).await?);
            draft
        }
        None => {
            info!(tag = %config.tag, "No release for tag yet");
            ReleaseDraft::nightly_default()
        }
    };

    create_release(config, &interpreter, draft, &mut ctx).await?;
    upload_assets(config, &interpreter, &assets, &mut ctx).await?;

    info!(count = ctx.uploaded.len(), "Assets uploaded successfully");
    let release = ctx.release.ok_or_else(|| DeployError::UnexpectedResponse {
        stage: Stage::Create,
        response: "no release after creation".to_string(),
    })?;

    Ok(DeployOutcome::Published {
        release,
        replaced: ctx.replaced,
        uploaded: ctx.uploaded,
    })
}

fn authenticate<I, C>(config: &DeployConfig, connect: C) -> Result<I, DeployError>
where
    I: ReleaseInterpreter,
    C: FnOnce(&str) -> Result<I, I::Error>,
{
    let token = match config.token.as_deref() {
        Some(token) if !token.is_empty() => token,
        _ => return Err(DeployError::MissingToken),
    };

    info!("Authenticating...");
    connect(token).map_err(|e| DeployError::api(Stage::Authenticate, e))
}

async fn fetch_release<I: ReleaseInterpreter>(
    config: &DeployConfig,
    interpreter: &I,
) -> Result<Option<ReleaseData>, DeployError> {
    info!(tag = %config.tag, "Getting release info...");
    let response = interpreter
        .interpret(ReleaseEffect::GetReleaseByTag {
            tag: config.tag.clone(),
        })
        .await
        .map_err(|e| DeployError::api(Stage::Lookup, e))?;

    match response {
        ReleaseResponse::Release(release) => Ok(Some(release)),
        ReleaseResponse::ReleaseNotFound => Ok(None),
        other => Err(unexpected(Stage::Lookup, &other)),
    }
}

/// Deletes the stale release and returns its id.
async fn delete_release<I: ReleaseInterpreter>(
    interpreter: &I,
    release: ReleaseData,
) -> Result<ReleaseId, DeployError> {
    info!(release_id = %release.id, "Deleting release...");
    let response = interpreter
        .interpret(ReleaseEffect::DeleteRelease { id: release.id })
        .await
        .map_err(|e| DeployError::api(Stage::Delete, e))?;

    match response {
        ReleaseResponse::Deleted => {
            info!("Release is deleted successfully");
            Ok(release.id)
        }
        other => Err(unexpected(Stage::Delete, &other)),
    }
}

async fn create_release<I: ReleaseInterpreter>(
    config: &DeployConfig,
    interpreter: &I,
    draft: ReleaseDraft,
    ctx: &mut RunContext,
) -> Result<(), DeployError> {
    info!(tag = %config.tag, branch = %config.branch, "Creating a new release...");
    let response = interpreter
        .interpret(ReleaseEffect::CreateRelease {
            tag: config.tag.clone(),
            target_commitish: config.branch.clone(),
            name: draft.name,
            body: draft.body,
            draft: false,
            prerelease: true,
        })
        .await
        .map_err(|e| DeployError::api(Stage::Create, e))?;

    match response {
        ReleaseResponse::Release(release) => {
            info!(release_id = %release.id, "Release is created successfully");
            ctx.release = Some(release);
            Ok(())
        }
        other => Err(unexpected(Stage::Create, &other)),
    }
}

async fn upload_assets<I: ReleaseInterpreter>(
    config: &DeployConfig,
    interpreter: &I,
    assets: &[String],
    ctx: &mut RunContext,
) -> Result<(), DeployError> {
    let upload_url = match &ctx.release {
        Some(release) => release.upload_url.clone(),
        None => {
            return Err(DeployError::UnexpectedResponse {
                stage: Stage::Create,
                response: "no release to upload to".to_string(),
            });
        }
    };

    for name in assets {
        let stage = Stage::Upload {
            asset: name.clone(),
        };
        let file = AssetFile::load(&config.dir, name).await?;

        info!(asset = %name, size = file.size, content_type = file.content_type, "Uploading {}", name);
        let response = interpreter
            .interpret(ReleaseEffect::UploadAsset {
                upload_url: upload_url.clone(),
                name: file.name,
                content_type: file.content_type.to_string(),
                size: file.size,
                data: file.data.into(),
            })
            .await
            .map_err(|e| DeployError::api(stage.clone(), e))?;

        match response {
            ReleaseResponse::Uploaded => {
                info!(asset = %name, "Uploaded successfully");
                ctx.uploaded.push(name.clone());
            }
            other => return Err(unexpected(stage, &other)),
        }
    }

    Ok(())
}

fn unexpected(stage: Stage, response: &ReleaseResponse) -> DeployError {
    DeployError::UnexpectedResponse {
        stage,
        response: format!("{:?}", response),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeployTarget;
    use crate::test_utils::{MockError, RecordingInterpreter, release};
    use proptest::prelude::*;
    use std::path::Path;
    use tempfile::{TempDir, tempdir};

    fn dist_with(files: &[&str]) -> TempDir {
        let dir = tempdir().unwrap();
        for name in files {
            std::fs::write(dir.path().join(name), format!("contents of {}", name)).unwrap();
        }
        dir
    }

    fn config(dir: &Path, assets: &[&str], token: Option<&str>) -> DeployConfig {
        let mut config = DeployConfig::new(
            &DeployTarget::DEER,
            assets.iter().map(|a| a.to_string()).collect(),
            token.map(str::to_string),
        );
        config.dir = dir.to_path_buf();
        config
    }

    async fn run_with(
        config: &DeployConfig,
        mock: &RecordingInterpreter,
    ) -> Result<DeployOutcome, DeployError> {
        let handle = mock.clone();
        run(config, move |_token| Ok::<_, MockError>(handle)).await
    }

    // ─── Early exits ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn no_existing_assets_makes_no_calls() {
        let dir = dist_with(&[]);
        let config = config(dir.path(), &["a.deb", "b.exe"], Some("token"));
        let mock = RecordingInterpreter::default();

        let outcome = run_with(&config, &mock).await.unwrap();

        assert_eq!(outcome, DeployOutcome::NothingToUpload);
        assert!(mock.effects().is_empty());
    }

    #[tokio::test]
    async fn empty_asset_list_succeeds_without_token() {
        let dir = dist_with(&[]);
        let config = config(dir.path(), &[], None);
        let mock = RecordingInterpreter::default();

        let outcome = run_with(&config, &mock).await.unwrap();
        assert_eq!(outcome, DeployOutcome::NothingToUpload);
    }

    #[tokio::test]
    async fn missing_token_fails_before_any_call() {
        let dir = dist_with(&["a.deb"]);
        let config = config(dir.path(), &["a.deb"], None);
        let mock = RecordingInterpreter::default();
        let mut connected = false;

        let handle = mock.clone();
        let result = run(&config, |_token| {
            connected = true;
            Ok::<_, MockError>(handle)
        })
        .await;

        assert!(matches!(result, Err(DeployError::MissingToken)));
        assert!(!connected);
        assert!(mock.effects().is_empty());
    }

    #[tokio::test]
    async fn connect_receives_the_configured_token() {
        let dir = dist_with(&["a.deb"]);
        let config = config(dir.path(), &["a.deb"], Some("s3cret"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::ReleaseNotFound),
            Ok(ReleaseResponse::Release(release(1, None, None))),
            Ok(ReleaseResponse::Uploaded),
        ]);

        let handle = mock.clone();
        let mut seen = None;
        run(&config, |token| {
            seen = Some(token.to_string());
            Ok::<_, MockError>(handle)
        })
        .await
        .unwrap();

        assert_eq!(seen.as_deref(), Some("s3cret"));
    }

    #[tokio::test]
    async fn connect_failure_is_authentication_error() {
        let dir = dist_with(&["a.deb"]);
        let config = config(dir.path(), &["a.deb"], Some("token"));

        let result = run(&config, |_token| {
            Err::<RecordingInterpreter, _>(MockError("bad token".to_string()))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.stage(), Some(&Stage::Authenticate));
    }

    // ─── Release replacement ──────────────────────────────────────────────────

    #[tokio::test]
    async fn existing_release_is_deleted_and_recreated_with_its_text() {
        let dir = dist_with(&["a.deb", "b.zip"]);
        let config = config(dir.path(), &["a.deb", "b.zip"], Some("token"));
        let existing = release(10, Some("Deer nightly"), Some("Built from support-CD"));
        let created = release(11, Some("Deer nightly"), Some("Built from support-CD"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::Release(existing)),
            Ok(ReleaseResponse::Deleted),
            Ok(ReleaseResponse::Release(created.clone())),
            Ok(ReleaseResponse::Uploaded),
            Ok(ReleaseResponse::Uploaded),
        ]);

        let outcome = run_with(&config, &mock).await.unwrap();

        assert_eq!(
            outcome,
            DeployOutcome::Published {
                release: created,
                replaced: Some(ReleaseId(10)),
                uploaded: vec!["a.deb".to_string(), "b.zip".to_string()],
            }
        );

        let effects = mock.effects();
        assert_eq!(
            effects[0],
            ReleaseEffect::GetReleaseByTag {
                tag: "nightly".to_string()
            }
        );
        assert_eq!(effects[1], ReleaseEffect::DeleteRelease { id: ReleaseId(10) });
        assert_eq!(
            effects[2],
            ReleaseEffect::CreateRelease {
                tag: "nightly".to_string(),
                target_commitish: "support-CD".to_string(),
                name: "Deer nightly".to_string(),
                body: "Built from support-CD".to_string(),
                draft: false,
                prerelease: true,
            }
        );
    }

    #[tokio::test]
    async fn missing_release_is_created_with_defaults_and_not_deleted() {
        let dir = dist_with(&["a.rpm"]);
        let config = config(dir.path(), &["a.rpm"], Some("token"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::ReleaseNotFound),
            Ok(ReleaseResponse::Release(release(5, None, None))),
            Ok(ReleaseResponse::Uploaded),
        ]);

        let outcome = run_with(&config, &mock).await.unwrap();

        assert!(matches!(
            outcome,
            DeployOutcome::Published { replaced: None, .. }
        ));
        assert_eq!(
            mock.operations(),
            vec!["getReleaseByTag", "createRelease", "uploadAsset"]
        );
        match &mock.effects()[1] {
            ReleaseEffect::CreateRelease { name, body, .. } => {
                assert_eq!(name, "nightly builds");
                assert_eq!(body, "nightly builds");
            }
            other => panic!("expected CreateRelease, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn lookup_failure_is_fatal() {
        let dir = dist_with(&["a.rpm"]);
        let config = config(dir.path(), &["a.rpm"], Some("token"));
        let mock = RecordingInterpreter::new(vec![Err(MockError("500".to_string()))]);

        let err = run_with(&config, &mock).await.unwrap_err();

        assert_eq!(err.stage(), Some(&Stage::Lookup));
        assert_eq!(mock.operations(), vec!["getReleaseByTag"]);
    }

    #[tokio::test]
    async fn delete_failure_stops_before_create() {
        let dir = dist_with(&["a.rpm"]);
        let config = config(dir.path(), &["a.rpm"], Some("token"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::Release(release(3, Some("n"), Some("b")))),
            Err(MockError("forbidden".to_string())),
        ]);

        let err = run_with(&config, &mock).await.unwrap_err();

        assert_eq!(err.stage(), Some(&Stage::Delete));
        assert_eq!(mock.operations(), vec!["getReleaseByTag", "deleteRelease"]);
    }

    #[tokio::test]
    async fn found_release_is_always_deleted_before_create() {
        let dir = dist_with(&["a.rpm"]);
        let config = config(dir.path(), &["a.rpm"], Some("token"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::Release(release(3, None, None))),
            Ok(ReleaseResponse::Uploaded),
        ]);

        let err = run_with(&config, &mock).await.unwrap_err();

        assert!(matches!(
            err,
            DeployError::UnexpectedResponse {
                stage: Stage::Delete,
                ..
            }
        ));
        assert_eq!(mock.operations(), vec!["getReleaseByTag", "deleteRelease"]);
    }

    #[tokio::test]
    async fn create_failure_stops_before_uploads() {
        let dir = dist_with(&["a.rpm"]);
        let config = config(dir.path(), &["a.rpm"], Some("token"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::ReleaseNotFound),
            Err(MockError("422".to_string())),
        ]);

        let err = run_with(&config, &mock).await.unwrap_err();

        assert_eq!(err.stage(), Some(&Stage::Create));
        assert!(mock.uploaded_names().is_empty());
    }

    #[tokio::test]
    async fn mismatched_response_is_reported() {
        let dir = dist_with(&["a.rpm"]);
        let config = config(dir.path(), &["a.rpm"], Some("token"));
        let mock = RecordingInterpreter::new(vec![Ok(ReleaseResponse::Deleted)]);

        let err = run_with(&config, &mock).await.unwrap_err();

        assert!(matches!(
            err,
            DeployError::UnexpectedResponse {
                stage: Stage::Lookup,
                ..
            }
        ));
    }

    // ─── Uploads ──────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn uploads_go_to_the_new_release_with_file_details() {
        let dir = dist_with(&["deer.dmg"]);
        let config = config(dir.path(), &["deer.dmg"], Some("token"));
        let created = release(21, None, None);
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::Release(release(20, None, None))),
            Ok(ReleaseResponse::Deleted),
            Ok(ReleaseResponse::Release(created.clone())),
            Ok(ReleaseResponse::Uploaded),
        ]);

        run_with(&config, &mock).await.unwrap();

        match &mock.effects()[3] {
            ReleaseEffect::UploadAsset {
                upload_url,
                name,
                content_type,
                size,
                data,
            } => {
                assert_eq!(upload_url, &created.upload_url);
                assert_eq!(name, "deer.dmg");
                assert_eq!(content_type, "application/x-apple-diskimage");
                assert_eq!(*size, "contents of deer.dmg".len() as u64);
                assert_eq!(data.0, b"contents of deer.dmg");
            }
            other => panic!("expected UploadAsset, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn upload_failure_aborts_remaining_uploads() {
        let names = ["a.deb", "b.rpm", "c.zip", "d.exe"];
        let dir = dist_with(&names);
        let config = config(dir.path(), &names, Some("token"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::ReleaseNotFound),
            Ok(ReleaseResponse::Release(release(1, None, None))),
            Ok(ReleaseResponse::Uploaded),
            Err(MockError("502".to_string())),
            Ok(ReleaseResponse::Uploaded),
            Ok(ReleaseResponse::Uploaded),
        ]);

        let err = run_with(&config, &mock).await.unwrap_err();

        assert_eq!(
            err.stage(),
            Some(&Stage::Upload {
                asset: "b.rpm".to_string()
            })
        );
        assert_eq!(mock.uploaded_names(), vec!["a.deb", "b.rpm"]);
        assert_eq!(mock.remaining_script(), 2);
    }

    #[tokio::test]
    async fn missing_candidates_are_skipped_in_order() {
        let dir = dist_with(&["b.rpm", "d.exe"]);
        let config = config(dir.path(), &["a.deb", "b.rpm", "c.zip", "d.exe"], Some("t"));
        let mock = RecordingInterpreter::new(vec![
            Ok(ReleaseResponse::ReleaseNotFound),
            Ok(ReleaseResponse::Release(release(1, None, None))),
            Ok(ReleaseResponse::Uploaded),
            Ok(ReleaseResponse::Uploaded),
        ]);

        run_with(&config, &mock).await.unwrap();

        assert_eq!(mock.uploaded_names(), vec!["b.rpm", "d.exe"]);
    }

    // ─── Property Tests ───────────────────────────────────────────────────────

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn uploads_stop_at_first_failure(count in 1usize..8, fail_at in 0usize..8) {
            let names: Vec<String> = (0..count).map(|i| format!("asset{}.zip", i)).collect();
            let refs: Vec<&str> = names.iter().map(String::as_str).collect();
            let dir = dist_with(&refs);
            let config = config(dir.path(), &refs, Some("token"));

            let mut script = vec![
                Ok(ReleaseResponse::ReleaseNotFound),
                Ok(ReleaseResponse::Release(release(1, None, None))),
            ];
            for i in 0..count {
                if i == fail_at {
                    script.push(Err(MockError("boom".to_string())));
                } else {
                    script.push(Ok(ReleaseResponse::Uploaded));
                }
            }
            let mock = RecordingInterpreter::new(script);

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let result = runtime.block_on(run_with(&config, &mock));

            let attempted = mock.uploaded_names();
            if fail_at < count {
                prop_assert!(result.is_err());
                prop_assert_eq!(attempted, names[..=fail_at].to_vec());
            } else {
                prop_assert!(result.is_ok());
                prop_assert_eq!(attempted, names);
            }
        }
    }
}
