//! Synthesis, optionally run twice for a convergence check.

use tracing::{info, warn};

use super::error::{PipelineError, PipelineResult, Stage};
use crate::config::Language;
use crate::metrics::{verify_synthesis, SynthesisVerification};
use crate::prompts;
use crate::provider::ModelBinding;
use crate::types::{Critique, Proposal, Synthesis, Usage};

/// Output of the synthesizer stage.
#[derive(Debug, Clone)]
pub struct SynthesisOutcome {
    pub synthesis: Synthesis,
    /// Present when an alternate synthesizer ran.
    pub verification: Option<SynthesisVerification>,
    pub usage: Usage,
}

/// Produce the final answer. When `alternate` is given, both synthesizers
/// run concurrently over identical input and their keyword overlap decides
/// whether the result is verified.
pub async fn synthesize(
    primary: &ModelBinding,
    alternate: Option<&ModelBinding>,
    proposals: &[Proposal],
    critique: &Critique,
    language: Language,
    context: Option<&str>,
    verification_summary: Option<&str>,
) -> PipelineResult<SynthesisOutcome> {
    let prompt = prompts::synthesizer(
        language,
        proposals,
        &critique.content,
        context,
        verification_summary,
    );

    let Some(alternate) = alternate else {
        let response = primary.call(&prompt).await.map_err(|source| PipelineError::Stage {
            stage: Stage::Synthesizer,
            source,
        })?;
        let usage = response.usage();
        info!(model = %primary.model, "synthesis complete");
        return Ok(SynthesisOutcome {
            synthesis: Synthesis::new(primary.label(), response.content),
            verification: None,
            usage,
        });
    };

    let (first, second) = tokio::join!(primary.call(&prompt), alternate.call(&prompt));
    let first = first.map_err(|source| PipelineError::Stage {
        stage: Stage::Synthesizer,
        source,
    })?;
    let second = second.map_err(|source| PipelineError::Stage {
        stage: Stage::AltSynthesizer,
        source,
    })?;

    let verification = verify_synthesis(&first.content, &second.content, &alternate.label());
    if verification.diverged {
        warn!(
            similarity = verification.similarity,
            alt_model = %alternate.model,
            "dual-run syntheses diverged"
        );
    } else {
        info!(similarity = verification.similarity, "dual-run syntheses agree");
    }

    Ok(SynthesisOutcome {
        usage: first.usage() + second.usage(),
        synthesis: Synthesis::new(primary.label(), first.content),
        verification: Some(verification),
    })
}
