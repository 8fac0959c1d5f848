//! Deployment configuration and CI gating.
//!
//! Everything here is derived from the CI environment once at startup and is
//! immutable afterwards. The environment is read through a lookup function so
//! tests can supply their own variables without touching the process.

use std::fmt;
use std::path::PathBuf;

use crate::types::RepoId;

/// Repository slug reported by the CI system.
pub const REPO_SLUG_VAR: &str = "TRAVIS_REPO_SLUG";
/// `"false"` for branch builds, the PR number otherwise.
pub const PULL_REQUEST_VAR: &str = "TRAVIS_PULL_REQUEST";
/// Branch being built.
pub const BRANCH_VAR: &str = "TRAVIS_BRANCH";
/// Access token for the release API.
pub const TOKEN_VAR: &str = "GH_TOKEN";
/// Set to log effects instead of executing them.
pub const DRY_RUN_VAR: &str = "NIGHTLY_DEPLOY_DRY_RUN";

/// The one repository, branch and tag this tool publishes for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployTarget {
    pub owner: &'static str,
    pub repo: &'static str,
    pub branch: &'static str,
    pub tag: &'static str,
    pub dist_dir: &'static str,
}

impl DeployTarget {
    pub const DEER: Self = Self {
        owner: "abahmed",
        repo: "Deer",
        branch: "support-CD",
        tag: "nightly",
        dist_dir: "./dist",
    };

    pub fn repo_id(&self) -> RepoId {
        RepoId::new(self.owner, self.repo)
    }
}

impl Default for DeployTarget {
    fn default() -> Self {
        Self::DEER
    }
}

/// Variables read from the CI environment.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CiEnvironment {
    pub repo_slug: Option<String>,
    pub pull_request: Option<String>,
    pub branch: Option<String>,
    pub token: Option<String>,
    pub dry_run: bool,
}

/// Why a CI run does not deploy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The build belongs to a fork or another repository.
    WrongRepository { expected: String },
    /// The build is for a pull request.
    PullRequest,
    /// The build is for a branch other than the deploy branch.
    WrongBranch { branch: Option<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::WrongRepository { expected } => {
                write!(f, "Deployment is only done for {}", expected)
            }
            SkipReason::PullRequest => write!(f, "Deployment is not done for Pull Requests"),
            SkipReason::WrongBranch { branch } => match branch {
                Some(b) => write!(f, "No deployments for {}", b),
                None => write!(f, "No deployments for builds without a branch"),
            },
        }
    }
}

/// Outcome of checking the CI environment against the deploy target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    Deploy,
    Skip(SkipReason),
}

impl CiEnvironment {
    /// Reads the CI variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let dry_run = lookup(DRY_RUN_VAR)
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        CiEnvironment {
            repo_slug: lookup(REPO_SLUG_VAR),
            pull_request: lookup(PULL_REQUEST_VAR),
            branch: lookup(BRANCH_VAR),
            token: lookup(TOKEN_VAR).filter(|t| !t.is_empty()),
            dry_run,
        }
    }

    /// Reads the CI variables from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Whether this is a pull-request build.
    ///
    /// Only the literal `"false"` marks a branch build; an unset variable is
    /// treated as a pull request.
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.as_deref() != Some("false")
    }

    /// Decides whether this run deploys.
    ///
    /// Repository is checked first, then the pull-request flag, then the branch.
    pub fn gate(&self, target: &DeployTarget) -> GateDecision {
        let expected = target.repo_id().slug();
        if self.repo_slug.as_deref() != Some(expected.as_str()) {
            return GateDecision::Skip(SkipReason::WrongRepository { expected });
        }

        if self.is_pull_request() {
            return GateDecision::Skip(SkipReason::PullRequest);
        }

        if self.branch.as_deref() != Some(target.branch) {
            return GateDecision::Skip(SkipReason::WrongBranch {
                branch: self.branch.clone(),
            });
        }

        GateDecision::Deploy
    }
}

impl fmt::Debug for CiEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CiEnvironment")
            .field("repo_slug", &self.repo_slug)
            .field("pull_request", &self.pull_request)
            .field("branch", &self.branch)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

fn is_truthy(value: &str) -> bool {
    let value = value.trim();
    !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
}

/// Immutable configuration for one deploy run.
#[derive(Clone, PartialEq, Eq)]
pub struct DeployConfig {
    pub repo: RepoId,
    pub branch: String,
    pub tag: String,
    /// Candidate asset file names, in upload order.
    pub assets: Vec<String>,
    pub dir: PathBuf,
    pub token: Option<String>,
}

impl DeployConfig {
    pub fn new(target: &DeployTarget, assets: Vec<String>, token: Option<String>) -> Self {
        DeployConfig {
            repo: target.repo_id(),
            branch: target.branch.to_string(),
            tag: target.tag.to_string(),
            assets,
            dir: PathBuf::from(target.dist_dir),
            token: token.filter(|t| !t.is_empty()),
        }
    }
}

impl fmt::Debug for DeployConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployConfig")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("tag", &self.tag)
            .field("assets", &self.assets)
            .field("dir", &self.dir)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
