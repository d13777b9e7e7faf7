//! Single-turn red-team critique.

use tracing::info;

use super::error::{PipelineError, PipelineResult, Stage};
use crate::config::Language;
use crate::prompts;
use crate::provider::ModelBinding;
use crate::types::{Critique, Proposal, Usage};

/// One critic call over all proposals. Scores and flags in the response are
/// not parsed.
pub async fn critique(
    critic: &ModelBinding,
    proposals: &[Proposal],
    language: Language,
    context: Option<&str>,
    verification: Option<&str>,
) -> PipelineResult<(Critique, Usage)> {
    let prompt = prompts::critic(language, proposals, context, verification);
    let response = critic.call(&prompt).await.map_err(|source| PipelineError::Stage {
        stage: Stage::Critic,
        source,
    })?;
    info!(model = %critic.model, tokens = response.tokens, "critique complete");
    let usage = response.usage();
    Ok((Critique::new(critic.label(), response.content), usage))
}
