use std::convert::Infallible;
use std::path::Path;
use std::process::ExitCode;

use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nightly_deploy::assets::{ASSET_PATTERNS, resolve_candidates};
use nightly_deploy::config::{CiEnvironment, DeployConfig, DeployTarget, GateDecision};
use nightly_deploy::deploy::{DeployError, DeployOutcome, run};
use nightly_deploy::dry_run::DryRunInterpreter;
use nightly_deploy::github::{GitHubApiError, OctocrabClient};

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nightly_deploy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let target = DeployTarget::default();
    let ci = CiEnvironment::from_env();
    debug!(?ci, "Read CI environment");

    if let GateDecision::Skip(reason) = ci.gate(&target) {
        info!("{}", reason);
        return ExitCode::SUCCESS;
    }

    let candidates = match resolve_candidates(Path::new(target.dist_dir), ASSET_PATTERNS) {
        Ok(candidates) => candidates,
        Err(e) => {
            error!(error = %e, "Failed to deploy");
            return ExitCode::FAILURE;
        }
    };
    debug!(?candidates, "Resolved candidate assets");

    let config = DeployConfig::new(&target, candidates, ci.token.clone());
    let dry_run = ci.dry_run;

    // Running the pipeline on its own task turns a panic into a JoinError
    // here, so every failure ends with the same log line and exit status.
    let task = tokio::spawn(async move { deploy(config, dry_run).await });

    match task.await {
        Ok(Ok(DeployOutcome::NothingToUpload)) => ExitCode::SUCCESS,
        Ok(Ok(DeployOutcome::Published {
            release, uploaded, ..
        })) => {
            info!(release_id = %release.id, assets = uploaded.len(), "Nightly release published");
            ExitCode::SUCCESS
        }
        Ok(Err(e)) => {
            error!(error = %e, "Failed to deploy");
            ExitCode::FAILURE
        }
        Err(e) => {
            error!(error = %e, "Failed to deploy");
            ExitCode::FAILURE
        }
    }
}

async fn deploy(config: DeployConfig, dry_run: bool) -> Result<DeployOutcome, DeployError> {
    let repo = config.repo.clone();
    if dry_run {
        info!("Dry run: no release will be changed");
        run(&config, move |_token| {
            Ok::<_, Infallible>(DryRunInterpreter::new(repo))
        })
        .await
    } else {
        run(&config, move |token| {
            OctocrabClient::from_token(token, repo).map_err(GitHubApiError::from_octocrab)
        })
        .await
    }
}

