//! Generator fan-out: every generator answers the question concurrently.

use futures::future::join_all;
use tracing::{info, warn};

use super::error::{PipelineError, PipelineResult};
use crate::config::{ConfigError, Language};
use crate::prompts;
use crate::provider::{ModelBinding, ProviderError};
use crate::types::{Proposal, Usage};

/// Proposals in generator order plus the usage of successful calls.
#[derive(Debug, Clone)]
pub struct FanOut {
    pub proposals: Vec<Proposal>,
    pub usage: Usage,
}

impl FanOut {
    pub fn failed_count(&self) -> usize {
        self.proposals.iter().filter(|p| p.is_error()).count()
    }
}

/// Ask every generator concurrently. A failed call becomes an error-marked
/// proposal in its slot; the batch fails only when no call succeeds.
pub async fn fan_out(
    generators: &[ModelBinding],
    question: &str,
    language: Language,
    context: Option<&str>,
) -> PipelineResult<FanOut> {
    if generators.is_empty() {
        return Err(ConfigError::NoGenerators.into());
    }
    let prompt = prompts::generator(language, question, context);

    let calls = generators.iter().map(|g| {
        let prompt = prompt.as_str();
        async move { (g, g.call(prompt).await) }
    });
    let results = join_all(calls).await;

    let mut proposals = Vec::with_capacity(results.len());
    let mut usage = Usage::default();
    let mut first_error: Option<ProviderError> = None;
    let mut failed = 0usize;

    for (binding, result) in results {
        match result {
            Ok(response) => {
                usage += response.usage();
                proposals.push(Proposal::new(binding.label(), response.content));
            }
            Err(e) => {
                warn!(
                    provider = binding.provider_name(),
                    model = %binding.model,
                    error = %e,
                    "generator failed, keeping error slot"
                );
                proposals.push(Proposal::failed(
                    binding.provider_name(),
                    binding.label(),
                    &e.to_string(),
                ));
                failed += 1;
                first_error.get_or_insert(e);
            }
        }
    }

    if let Some(first) = first_error {
        if failed == generators.len() {
            return Err(PipelineError::AllGeneratorsFailed {
                count: failed,
                first,
            });
        }
    }

    info!(
        succeeded = generators.len() - failed,
        failed,
        "generator fan-out complete"
    );
    Ok(FanOut { proposals, usage })
}
