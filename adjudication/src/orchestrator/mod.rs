//! Orchestrator: sequences the stages into one pipeline run per question.
//!
//! ```text
//! question ─► normalize ─► prior context ─► generator fan-out
//!          ─► claim verification (optional) ─► critic ─► synthesizer
//!          ─► metrics ─► ledger.save
//! ```
//!
//! Any failure before the save aborts the run and nothing is persisted.

mod deep;

pub use deep::{MAX_DEEP_RUNS, MIN_DEEP_RUNS, MULTI_CRITIC};

use std::time::Instant;

use tracing::{info, Instrument, Span};
use uuid::Uuid;

use crate::config::{CriticMode, PipelineConfig};
use crate::ledger::{render_context, Block, BlockDraft, BlockLedger, ContextSelector};
use crate::metrics::{Metrics, MetricsInput};
use crate::pipeline::{
    critique, cross_examine, fan_out, synthesize, verify_claims, PipelineError, PipelineResult,
};
use crate::provider::ProviderSet;

/// Per-run options that are not part of the pipeline configuration.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Earlier blocks to feed in as context.
    pub context: Option<ContextSelector>,
    /// Externally supplied suspected-false-consensus signal for DPR.
    pub sas_warning: bool,
}

/// Question and context resolved before any provider call.
struct Prepared {
    question: String,
    normalized: String,
    context: Option<String>,
    context_refs: Vec<String>,
}

/// Create the root span of a pipeline run.
///
/// `block.id` is recorded once the block is saved.
fn run_span(run_id: &Uuid, mode: &str) -> Span {
    tracing::info_span!(
        "adjudication.run",
        "run.id" = %run_id,
        "run.mode" = mode,
        "block.id" = tracing::field::Empty,
    )
}

pub struct Orchestrator {
    config: PipelineConfig,
    providers: ProviderSet,
    ledger: BlockLedger,
}

impl Orchestrator {
    /// Assemble an orchestrator. The configuration is validated here, before
    /// any stage can run.
    pub fn new(
        config: PipelineConfig,
        providers: ProviderSet,
        ledger: BlockLedger,
    ) -> PipelineResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            providers,
            ledger,
        })
    }

    /// Network-backed orchestrator with the ledger at `config.ledger_path`.
    pub fn from_config(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let providers =
            ProviderSet::from_config(&config).map_err(PipelineError::ProviderUnavailable)?;
        let ledger = BlockLedger::open(&config.ledger_path)?;
        Self::new(config, providers, ledger)
    }

    /// Offline orchestrator: every provider returns simulated text.
    pub fn dry_run(config: PipelineConfig) -> PipelineResult<Self> {
        config.validate()?;
        let providers = ProviderSet::dry_run(&config);
        let ledger = BlockLedger::open(&config.ledger_path)?;
        Self::new(config, providers, ledger)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &BlockLedger {
        &self.ledger
    }

    fn prepare(&self, question: &str, options: &RunOptions) -> PipelineResult<Prepared> {
        let normalized = question.trim().to_string();
        if normalized.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        self.providers
            .ensure_available()
            .map_err(PipelineError::ProviderUnavailable)?;

        let blocks = match &options.context {
            Some(selector) => selector.resolve(&self.ledger)?,
            None => Vec::new(),
        };
        if options.context.is_some() {
            info!(blocks = blocks.len(), "loaded prior context");
        }

        Ok(Prepared {
            question: question.to_string(),
            normalized,
            context: render_context(&blocks),
            context_refs: blocks.into_iter().map(|b| b.id).collect(),
        })
    }

    /// Run the full pipeline for one question and persist the result.
    pub async fn run(&self, question: &str, options: &RunOptions) -> PipelineResult<Block> {
        let run_id = Uuid::new_v4();
        let span = run_span(&run_id, "single");
        self.run_inner(question, options)
            .instrument(span.clone())
            .await
            .inspect(|block| {
                span.record("block.id", block.id.as_str());
            })
    }

    async fn run_inner(&self, question: &str, options: &RunOptions) -> PipelineResult<Block> {
        let started = Instant::now();
        let prepared = self.prepare(question, options)?;
        let context = prepared.context.as_deref();
        let language = self.config.language;

        info!(
            generators = self.providers.generators.len(),
            critic_mode = %self.config.critic_mode,
            dual_run = self.providers.alt_synthesizer.is_some(),
            "pipeline run started"
        );

        let generated = fan_out(
            &self.providers.generators,
            &prepared.normalized,
            language,
            context,
        )
        .await?;
        let mut usage = generated.usage;
        let proposals = generated.proposals;

        let report = match &self.providers.search {
            Some(search) => {
                let (report, spent) = verify_claims(
                    &self.providers.critic,
                    search,
                    &proposals,
                    language,
                    self.config.max_claims,
                )
                .await;
                usage += spent;
                Some(report)
            }
            None => None,
        };
        let verification = report.as_ref().map(|r| r.summary.as_str());

        let (critique, spent) = match self.config.critic_mode {
            CriticMode::Single => {
                critique(
                    &self.providers.critic,
                    &proposals,
                    language,
                    context,
                    verification,
                )
                .await?
            }
            CriticMode::MultiTurn => {
                cross_examine(
                    &self.providers.critic,
                    &self.providers.generators,
                    &proposals,
                    language,
                    context,
                    verification,
                )
                .await?
            }
        };
        usage += spent;

        let outcome = synthesize(
            &self.providers.synthesizer,
            self.providers.alt_synthesizer.as_ref(),
            &proposals,
            &critique,
            language,
            context,
            verification,
        )
        .await?;
        usage += outcome.usage;

        let metadata = Metrics::compute(MetricsInput {
            proposals: &proposals,
            critique: &critique,
            synthesis: &outcome.synthesis,
            usage,
            duration_seconds: started.elapsed().as_secs_f64(),
            sas_warning: options.sas_warning,
            verification: outcome.verification,
        });

        let block = self.ledger.save(BlockDraft {
            question: prepared.question,
            normalized_question: prepared.normalized,
            proposals,
            critique,
            synthesis: outcome.synthesis,
            metadata,
            context_refs: prepared.context_refs,
        })?;

        info!(
            block_id = %block.id,
            tokens = block.metadata.total_tokens,
            cost_usd = block.metadata.total_cost_usd,
            mdi = block.metadata.model_diversity_index,
            "pipeline run complete"
        );
        Ok(block)
    }
}
