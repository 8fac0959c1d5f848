//! Deploy pipeline errors.

use std::fmt;

use thiserror::Error;

use crate::assets::AssetError;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The remote call a failure is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Authenticate,
    Lookup,
    Delete,
    Create,
    Upload { asset: String },
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Authenticate => write!(f, "authenticate"),
            Stage::Lookup => write!(f, "getReleaseByTag"),
            Stage::Delete => write!(f, "deleteRelease"),
            Stage::Create => write!(f, "createRelease"),
            Stage::Upload { asset } => write!(f, "uploadAsset ({})", asset),
        }
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    /// No access token; raised before any remote call.
    #[error("Token is not provided")]
    MissingToken,

    #[error("Unhandled response for {stage}: {source}")]
    Api {
        stage: Stage,
        #[source]
        source: BoxError,
    },

    /// The interpreter answered an effect with a response of the wrong shape.
    #[error("Unexpected response for {stage}: {response}")]
    UnexpectedResponse { stage: Stage, response: String },

    #[error(transparent)]
    Asset(#[from] AssetError),
}

impl DeployError {
    pub fn api<E>(stage: Stage, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        DeployError::Api {
            stage,
            source: Box::new(source),
        }
    }

    /// The stage the run failed in, if it failed on a remote call.
    pub fn stage(&self) -> Option<&Stage> {
        match self {
            DeployError::Api { stage, .. } | DeployError::UnexpectedResponse { stage, .. } => {
                Some(stage)
            }
            DeployError::MissingToken | DeployError::Asset(_) => None,
        }
    }
}
