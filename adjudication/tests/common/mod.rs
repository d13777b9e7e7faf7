//! Scripted providers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use adjudication::provider::{
    ModelBinding, Provider, ProviderError, ProviderResponse, ProviderResult, ProviderSet,
};
use async_trait::async_trait;

type Script = Box<dyn Fn(usize, &str) -> ProviderResult<String> + Send + Sync>;

/// Provider whose reply is computed from the call index and prompt.
/// Every prompt it receives is recorded.
pub struct ScriptedProvider {
    name: String,
    script: Script,
    delay: Duration,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(
        name: &str,
        script: impl Fn(usize, &str) -> ProviderResult<String> + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Box::new(script),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always answers with `text`.
    pub fn fixed(name: &str, text: &str) -> Arc<Self> {
        let text = text.to_string();
        Self::new(name, move |_, _| Ok(text.clone()))
    }

    /// Answers with `text` after sleeping for `delay`.
    pub fn slow(name: &str, text: &str, delay: Duration) -> Arc<Self> {
        let text = text.to_string();
        Arc::new(Self {
            name: name.to_string(),
            script: Box::new(move |_, _| Ok(text.clone())),
            delay,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    /// Always fails with a server error.
    pub fn failing(name: &str) -> Arc<Self> {
        let provider = name.to_string();
        Self::new(name, move |_, _| {
            Err(ProviderError::ServerError {
                provider: provider.clone(),
                status: 503,
                body: "overloaded".to_string(),
            })
        })
    }

    /// Answers `text` for the first `ok_calls` calls, then fails.
    pub fn fails_after(name: &str, ok_calls: usize, text: &str) -> Arc<Self> {
        let provider = name.to_string();
        let text = text.to_string();
        Self::new(name, move |n, _| {
            if n < ok_calls {
                Ok(text.clone())
            } else {
                Err(ProviderError::Timeout {
                    provider: provider.clone(),
                    after: Duration::from_secs(60),
                })
            }
        })
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, _model: &str, prompt: &str) -> ProviderResult<ProviderResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let content = (self.script)(n, prompt)?;
        Ok(ProviderResponse {
            content,
            tokens: 100,
            cost: 0.001,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}

pub fn bind(provider: &Arc<ScriptedProvider>, model: &str) -> ModelBinding {
    ModelBinding::new(provider.clone(), model)
}

/// A provider set where every role answers with fixed text.
pub fn fixed_set(generator_texts: &[(&str, &str)], critic: &str, synthesis: &str) -> ProviderSet {
    ProviderSet {
        generators: generator_texts
            .iter()
            .map(|(model, text)| bind(&ScriptedProvider::fixed("mock", text), model))
            .collect(),
        critic: bind(&ScriptedProvider::fixed("mock", critic), "critic-model"),
        synthesizer: bind(&ScriptedProvider::fixed("mock", synthesis), "synth-model"),
        alt_synthesizer: None,
        search: None,
    }
}
