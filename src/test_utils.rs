//! Shared test utilities: a scripted, recording release interpreter.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex};

use thiserror::Error;

use crate::effects::{ReleaseEffect, ReleaseInterpreter, ReleaseResponse};
use crate::types::{ReleaseData, ReleaseId};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("mock failure: {0}")]
pub struct MockError(pub String);

/// Replays scripted responses in order and records every effect it sees.
///
/// Clones share the same script and log, so a test can hand one clone to the
/// pipeline and inspect the other afterwards.
#[derive(Clone, Default)]
pub struct RecordingInterpreter {
    script: Arc<Mutex<VecDeque<Result<ReleaseResponse, MockError>>>>,
    log: Arc<Mutex<Vec<ReleaseEffect>>>,
}

impl RecordingInterpreter {
    pub fn new(script: Vec<Result<ReleaseResponse, MockError>>) -> Self {
        RecordingInterpreter {
            script: Arc::new(Mutex::new(script.into())),
            log: Arc::default(),
        }
    }

    pub fn effects(&self) -> Vec<ReleaseEffect> {
        self.log.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<&'static str> {
        self.effects().iter().map(|e| e.operation()).collect()
    }

    /// Names of the assets the pipeline tried to upload, in order.
    pub fn uploaded_names(&self) -> Vec<String> {
        self.effects()
            .into_iter()
            .filter_map(|e| match e {
                ReleaseEffect::UploadAsset { name, .. } => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn remaining_script(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl ReleaseInterpreter for RecordingInterpreter {
    type Error = MockError;

    fn interpret(
        &self,
        effect: ReleaseEffect,
    ) -> impl Future<Output = Result<ReleaseResponse, Self::Error>> + Send {
        let next = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(MockError(format!("unscripted effect: {:?}", effect))));
        self.log.lock().unwrap().push(effect);
        async move { next }
    }
}

pub fn release(id: u64, name: Option<&str>, body: Option<&str>) -> ReleaseData {
    ReleaseData {
        id: ReleaseId(id),
        name: name.map(str::to_string),
        body: body.map(str::to_string),
        upload_url: format!(
            "https://uploads.github.com/repos/abahmed/Deer/releases/{}/assets{{?name,label}}",
            id
        ),
    }
}
