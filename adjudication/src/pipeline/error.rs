//! Errors surfaced by a pipeline run.

use thiserror::Error;

use super::cross_exam::{CrossExamPhase, TransitionError};
use crate::config::ConfigError;
use crate::ledger::LedgerError;
use crate::provider::ProviderError;

/// Stage a failed provider call belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Verification,
    Critic,
    Synthesizer,
    AltSynthesizer,
    MetaSynthesis,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Verification => write!(f, "verification"),
            Self::Critic => write!(f, "critic"),
            Self::Synthesizer => write!(f, "synthesizer"),
            Self::AltSynthesizer => write!(f, "alt_synthesizer"),
            Self::MetaSynthesis => write!(f, "meta_synthesis"),
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    /// Credential pre-check failed; no call was made.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(#[source] ProviderError),

    #[error("{stage} stage failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ProviderError,
    },

    /// Every generator call failed.
    #[error("all {count} generators failed; first error: {first}")]
    AllGeneratorsFailed { count: usize, first: ProviderError },

    /// A cross-examination round failed. No partial transcript is kept.
    #[error("cross-examination failed in {round} round: {source}")]
    CriticStage {
        round: CrossExamPhase,
        #[source]
        source: ProviderError,
    },

    #[error("cross-examination out of order: {0}")]
    Transition(#[from] TransitionError),

    #[error("invalid configuration: {0}")]
    ConfigInvalid(#[from] ConfigError),

    #[error("question is empty")]
    EmptyQuestion,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Result type for pipeline runs
pub type PipelineResult<T> = Result<T, PipelineError>;
