// Shared test doubles
// Author: kelexine (https://github.com/kelexine)

#![allow(dead_code)]

use async_trait::async_trait;
use eventforge::models::TokenUsage;
use eventforge::policy::ModelParams;
use eventforge::provider::{Generated, ProviderError, ProviderErrorKind, TextGenerator};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const TITLES_JSON: &str =
    r#"["Tech Leadership Summit", "Digital Innovation Forum", "Future Systems Expo"]"#;

/// Generator that replays a scripted sequence of outcomes.
///
/// Once the script runs out every call succeeds with `fallback`.
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<Generated, ProviderError>>>,
    fallback: Generated,
    calls: AtomicUsize,
    prompts: Mutex<Vec<(String, ModelParams)>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: ok(TITLES_JSON),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn replying(text: &str) -> Self {
        Self {
            fallback: ok(text),
            ..Self::new()
        }
    }

    pub fn then_err(self, kind: ProviderErrorKind) -> Self {
        self.script
            .lock()
            .push_back(Err(ProviderError::new(kind, format!("scripted {}", kind))));
        self
    }

    pub fn then_ok(self, text: &str) -> Self {
        self.script.lock().push_back(Ok(ok(text)));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_call(&self) -> Option<(String, ModelParams)> {
        self.prompts.lock().last().cloned()
    }
}

pub fn ok(text: &str) -> Generated {
    Generated {
        text: text.to_string(),
        usage: TokenUsage::new(150, 40),
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate_text(
        &self,
        prompt: &str,
        params: &ModelParams,
    ) -> Result<Generated, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts
            .lock()
            .push((prompt.to_string(), params.clone()));

        match self.script.lock().pop_front() {
            Some(outcome) => outcome,
            None => Ok(self.fallback.clone()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
