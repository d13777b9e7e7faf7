//! Offline provider that returns canned text without network access.

use async_trait::async_trait;

use super::error::ProviderResult;
use super::{Provider, ProviderResponse};

/// Marker prefixed to every simulated response.
pub const DRY_RUN_MARKER: &str = "[DRY-RUN]";

const EXCERPT_CHARS: usize = 80;

#[derive(Debug, Clone)]
pub struct DryRunProvider {
    name: String,
}

impl DryRunProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl Provider for DryRunProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, model: &str, prompt: &str) -> ProviderResult<ProviderResponse> {
        let first_line = prompt.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
        let excerpt: String = first_line.trim().chars().take(EXCERPT_CHARS).collect();
        Ok(ProviderResponse {
            content: format!(
                "{} Simulated response from {} ({}).\n\nPrompt began: \"{}\"\n\nThis placeholder stands in for the real analysis.",
                DRY_RUN_MARKER, model, self.name, excerpt
            ),
            tokens: 0,
            cost: 0.0,
        })
    }

    fn is_available(&self) -> bool {
        true
    }
}
