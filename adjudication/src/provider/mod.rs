//! Provider capability: send one prompt to one model, get text back.
//!
//! Concrete transports ([`ChatCompletionsProvider`], [`MessagesProvider`])
//! and the offline [`DryRunProvider`] implement [`Provider`]. Pipeline stages
//! never see a transport directly; they hold a [`ModelBinding`] which pairs a
//! shared provider with the model identifier it should be asked for, usually
//! wrapped in a [`GuardedProvider`] that applies timeouts and retries.

mod chat_completions;
mod dry_run;
mod error;
mod guarded;
mod messages;
mod pricing;
mod set;

use std::sync::Arc;

use async_trait::async_trait;

pub use chat_completions::ChatCompletionsProvider;
pub use dry_run::DryRunProvider;
pub use error::{ProviderError, ProviderResult};
pub use guarded::{CallPolicy, GuardedProvider};
pub use messages::MessagesProvider;
pub use pricing::estimate_cost;
pub use set::ProviderSet;

use crate::types::{model_label, Usage};

/// One completed model call.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub content: String,
    /// Total tokens (prompt + completion) reported by the provider.
    pub tokens: u64,
    /// Estimated cost in USD.
    pub cost: f64,
}

impl ProviderResponse {
    pub fn usage(&self) -> Usage {
        Usage::new(self.tokens, self.cost)
    }
}

/// A model vendor endpoint.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short provider name used in logs and error markers (e.g. `"xai"`).
    fn name(&self) -> &str;

    /// Send a single-turn prompt to `model`.
    async fn call(&self, model: &str, prompt: &str) -> ProviderResult<ProviderResponse>;

    /// Whether the provider has a credential configured.
    fn is_available(&self) -> bool;
}

pub type SharedProvider = Arc<dyn Provider>;

/// A provider paired with the model it serves for one pipeline role.
#[derive(Clone)]
pub struct ModelBinding {
    pub provider: SharedProvider,
    pub model: String,
}

impl ModelBinding {
    pub fn new(provider: SharedProvider, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    /// Display label of the bound model.
    pub fn label(&self) -> String {
        model_label(&self.model)
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_available()
    }

    pub async fn call(&self, prompt: &str) -> ProviderResult<ProviderResponse> {
        self.provider.call(&self.model, prompt).await
    }
}

impl std::fmt::Debug for ModelBinding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelBinding")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .finish()
    }
}
