//! Timeout and retry wrapper around any [`Provider`].

use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, warn};

use super::error::{ProviderError, ProviderResult};
use super::{Provider, ProviderResponse, SharedProvider};

/// Name fragments that mark a slow, high-capability model.
const SLOW_MODEL_MARKERS: &[&str] = &["opus", "reasoner", "thinking"];
const SLOW_MODEL_TOKENS: &[&str] = &["o1", "o3"];

/// Per-call timeout and retry settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallPolicy {
    /// Timeout for regular models, in seconds.
    pub fast_timeout_secs: u64,
    /// Timeout for high-capability models, in seconds.
    pub deep_timeout_secs: u64,
    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further retry.
    pub base_backoff_ms: u64,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            fast_timeout_secs: 60,
            deep_timeout_secs: 240,
            max_retries: 1,
            base_backoff_ms: 1000,
        }
    }
}

impl CallPolicy {
    /// Timeout applied to a single call on `model`.
    pub fn timeout_for(&self, model: &str) -> Duration {
        if is_high_capability(model) {
            Duration::from_secs(self.deep_timeout_secs)
        } else {
            Duration::from_secs(self.fast_timeout_secs)
        }
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.base_backoff_ms.saturating_mul(2u64.saturating_pow(attempt)))
    }
}

fn is_high_capability(model: &str) -> bool {
    let lower = model.to_lowercase();
    lower
        .split(|c| c == '-' || c == '/' || c == '.')
        .any(|tok| {
            SLOW_MODEL_TOKENS.contains(&tok) || SLOW_MODEL_MARKERS.iter().any(|m| tok.contains(m))
        })
}

/// Applies a [`CallPolicy`] to every call on the inner provider.
pub struct GuardedProvider {
    inner: SharedProvider,
    policy: CallPolicy,
}

impl GuardedProvider {
    pub fn new(inner: SharedProvider, policy: CallPolicy) -> Self {
        Self { inner, policy }
    }

    async fn attempt(&self, model: &str, prompt: &str) -> ProviderResult<ProviderResponse> {
        let limit = self.policy.timeout_for(model);
        match tokio::time::timeout(limit, self.inner.call(model, prompt)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: self.inner.name().to_string(),
                after: limit,
            }),
        }
    }
}

#[async_trait]
impl Provider for GuardedProvider {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn call(&self, model: &str, prompt: &str) -> ProviderResult<ProviderResponse> {
        if !self.inner.is_available() {
            return Err(ProviderError::Unavailable {
                provider: self.inner.name().to_string(),
            });
        }

        let mut attempt = 0u32;
        loop {
            let started = Instant::now();
            match self.attempt(model, prompt).await {
                Ok(response) => {
                    debug!(
                        provider = self.inner.name(),
                        model,
                        tokens = response.tokens,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "provider call complete"
                    );
                    return Ok(response);
                }
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt);
                    warn!(
                        provider = self.inner.name(),
                        model,
                        error = %e,
                        "call failed (attempt {}/{}), retrying in {:?}",
                        attempt + 1,
                        self.policy.max_retries + 1,
                        delay
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn is_available(&self) -> bool {
        self.inner.is_available()
    }
}
