//! Deep analysis: several runs with rotated roles plus a meta-synthesis.

use std::time::Instant;

use tracing::{info, Instrument};
use uuid::Uuid;

use super::{run_span, Orchestrator, RunOptions};
use crate::config::ConfigError;
use crate::ledger::{Block, BlockDraft};
use crate::metrics::text::round4;
use crate::metrics::{model_diversity_index, Metrics, MetricsInput};
use crate::pipeline::{critique, fan_out, synthesize, PipelineError, PipelineResult, Stage};
use crate::prompts::{self, RunDigest};
use crate::provider::ModelBinding;
use crate::types::{Critique, Proposal, Synthesis, Usage};

/// Agent pool size the rotations are laid out for.
const POOL_SIZE: usize = 4;

/// Label stored as the critique model of a deep block.
pub const MULTI_CRITIC: &str = "multi-critic";

/// Generator indices and critic index into the agent pool, per run.
const CONSTELLATIONS: [([usize; 3], usize); 5] = [
    ([0, 1, 2], 3),
    ([3, 1, 2], 0),
    ([0, 3, 2], 1),
    ([0, 1, 3], 2),
    ([3, 0, 1], 2),
];

pub const MIN_DEEP_RUNS: usize = 2;
pub const MAX_DEEP_RUNS: usize = CONSTELLATIONS.len();

struct RunResult {
    number: usize,
    constellation: String,
    proposals: Vec<Proposal>,
    critique: Critique,
    synthesis: Synthesis,
}

impl Orchestrator {
    /// Generators, padded with the critic and then the synthesizer until the
    /// pool holds four agents.
    fn agent_pool(&self) -> Vec<ModelBinding> {
        let mut pool = self.providers.generators.clone();
        if pool.len() < POOL_SIZE {
            pool.push(self.providers.critic.clone());
        }
        if pool.len() < POOL_SIZE {
            pool.push(self.providers.synthesizer.clone());
        }
        pool
    }

    /// Run `runs` rotated pipelines (2 to 5) and persist one block holding
    /// every proposal, every per-run critique and the meta-synthesis.
    pub async fn run_deep(
        &self,
        question: &str,
        runs: usize,
        options: &RunOptions,
    ) -> PipelineResult<Block> {
        if !(MIN_DEEP_RUNS..=MAX_DEEP_RUNS).contains(&runs) {
            return Err(ConfigError::DeepRunsOutOfRange(runs).into());
        }
        let run_id = Uuid::new_v4();
        let span = run_span(&run_id, "deep");
        self.run_deep_inner(question, runs, options)
            .instrument(span.clone())
            .await
            .inspect(|block| {
                span.record("block.id", block.id.as_str());
            })
    }

    async fn run_deep_inner(
        &self,
        question: &str,
        runs: usize,
        options: &RunOptions,
    ) -> PipelineResult<Block> {
        let started = Instant::now();
        let prepared = self.prepare(question, options)?;
        let context = prepared.context.as_deref();
        let language = self.config.language;
        let pool = self.agent_pool();
        let pick = |idx: usize| &pool[idx % pool.len()];

        let mut usage = Usage::default();
        let mut results: Vec<RunResult> = Vec::with_capacity(runs);

        for (i, (gen_idx, critic_idx)) in CONSTELLATIONS.iter().take(runs).enumerate() {
            let generators: Vec<ModelBinding> =
                gen_idx.iter().map(|&g| pick(g).clone()).collect();
            let critic = pick(*critic_idx);
            let constellation = format!(
                "{} / critic: {}",
                generators
                    .iter()
                    .map(|g| g.label())
                    .collect::<Vec<_>>()
                    .join(" + "),
                critic.label()
            );
            info!(run = i + 1, of = runs, %constellation, "deep run started");

            let generated =
                fan_out(&generators, &prepared.normalized, language, context).await?;
            usage += generated.usage;

            let (run_critique, spent) =
                critique(critic, &generated.proposals, language, context, None).await?;
            usage += spent;

            // Per-run synthesis is done by the run's critic.
            let outcome = synthesize(
                critic,
                None,
                &generated.proposals,
                &run_critique,
                language,
                context,
                None,
            )
            .await?;
            usage += outcome.usage;

            results.push(RunResult {
                number: i + 1,
                constellation,
                proposals: generated.proposals,
                critique: run_critique,
                synthesis: outcome.synthesis,
            });
        }

        let digests: Vec<RunDigest<'_>> = results
            .iter()
            .map(|r| RunDigest {
                number: r.number,
                constellation: &r.constellation,
                synthesis: &r.synthesis.content,
            })
            .collect();
        let meta_prompt = prompts::meta_synthesis(language, &digests);
        let meta = self
            .providers
            .synthesizer
            .call(&meta_prompt)
            .await
            .map_err(|source| PipelineError::Stage {
                stage: Stage::MetaSynthesis,
                source,
            })?;
        usage += meta.usage();

        let mut all_models: Vec<String> = Vec::new();
        for r in &results {
            all_models.extend(r.proposals.iter().map(|p| p.model.clone()));
            all_models.push(r.critique.model.clone());
            all_models.push(r.synthesis.model.clone());
        }
        all_models.push(self.providers.synthesizer.label());

        let critique = Critique::new(
            MULTI_CRITIC,
            results
                .iter()
                .map(|r| {
                    format!(
                        "=== CRITIC RUN {} ({}) ===\n{}",
                        r.number, r.constellation, r.critique.content
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n---\n\n"),
        );
        let synthesis = Synthesis::new(self.providers.synthesizer.label(), meta.content);
        let proposals: Vec<Proposal> = results.into_iter().flat_map(|r| r.proposals).collect();

        let mut metadata = Metrics::compute(MetricsInput {
            proposals: &proposals,
            critique: &critique,
            synthesis: &synthesis,
            usage,
            duration_seconds: started.elapsed().as_secs_f64(),
            sas_warning: options.sas_warning,
            verification: None,
        });
        // The stored critique label hides which models criticised, so MDI
        // is taken over every model that took part.
        metadata.model_diversity_index = round4(model_diversity_index(&all_models));

        let block = self.ledger.save(BlockDraft {
            question: format!("[DEEP-{}x] {}", runs, prepared.normalized),
            normalized_question: prepared.normalized,
            proposals,
            critique,
            synthesis,
            metadata,
            context_refs: prepared.context_refs,
        })?;

        info!(block_id = %block.id, runs, "deep analysis complete");
        Ok(block)
    }
}
