//! Ensemble adjudication for open-ended questions.
//!
//! A question goes through a fixed pipeline of independent language models:
//!
//! - several **generators** answer independently and concurrently
//! - a **critic** evaluates every answer, either in a single turn or as a
//!   three-round cross-examination where each generator defends itself
//! - a **synthesizer** writes the final answer, optionally twice with two
//!   different models to check that the result converges
//!
//! Every run is scored with deterministic text metrics (model diversity,
//! dissent, dissent preservation, synthesis balance) and persisted as a
//! numbered, immutable block in a directory-backed ledger. Earlier blocks can
//! be fed back in as context for follow-up questions.
//!
//! # Usage
//!
//! ```no_run
//! use adjudication::{Orchestrator, PipelineConfig, RunOptions};
//!
//! # async fn demo() -> Result<(), adjudication::PipelineError> {
//! let orchestrator = Orchestrator::dry_run(PipelineConfig::default())?;
//! let block = orchestrator
//!     .run("Should cities ban cars from the centre?", &RunOptions::default())
//!     .await?;
//! println!("{}: MDI {}", block.id, block.metadata.model_diversity_index);
//! # Ok(())
//! # }
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod config;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod pipeline;
pub mod prompts;
pub mod provider;
pub mod types;

pub use config::{ConfigError, CriticMode, Language, PipelineConfig, RoleSpec, Transport};
pub use ledger::{Block, BlockLedger, ContextSelector, LedgerError};
pub use metrics::Metrics;
pub use orchestrator::{Orchestrator, RunOptions, MAX_DEEP_RUNS, MIN_DEEP_RUNS};
pub use pipeline::{PipelineError, PipelineResult};
pub use provider::{ModelBinding, Provider, ProviderError, ProviderResponse, ProviderSet};
pub use types::{Critique, Proposal, Role, Synthesis, Usage};
