//! Scripted backend for tests: canned responses or errors per stage.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use embedgen_utils::error::LlmError;

use crate::types::{LlmBackend, LlmInvocation, LlmResult};

type ErrorFactory = Box<dyn Fn() -> LlmError + Send + Sync>;

enum Script {
    Respond(String),
    Fail(ErrorFactory),
}

/// An [`LlmBackend`] that answers from a script keyed by stage name and
/// records every invocation it receives.
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: HashMap<String, Script>,
    delay: Option<Duration>,
    calls: Mutex<Vec<LlmInvocation>>,
}

impl ScriptedBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(mut self, stage: &str, text: impl Into<String>) -> Self {
        self.scripts
            .insert(stage.to_string(), Script::Respond(text.into()));
        self
    }

    #[must_use]
    pub fn fail(
        mut self,
        stage: &str,
        error: impl Fn() -> LlmError + Send + Sync + 'static,
    ) -> Self {
        self.scripts
            .insert(stage.to_string(), Script::Fail(Box::new(error)));
        self
    }

    /// Sleep before answering, to exercise deadlines.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Invocations received so far, in order.
    #[must_use]
    pub fn invocations(&self) -> Vec<LlmInvocation> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        let stage = inv.stage.clone();
        let model = inv.model.clone();
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(inv);
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.scripts.get(&stage) {
            Some(Script::Respond(text)) => Ok(LlmResult::new(text.clone(), "scripted", model)),
            Some(Script::Fail(make_error)) => Err(make_error()),
            None => Err(LlmError::Transport(format!(
                "no scripted response for stage '{stage}'"
            ))),
        }
    }
}
