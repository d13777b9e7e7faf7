//! Pipeline stages: generator fan-out, claim verification, critic (single or
//! cross-examination) and synthesizer.
//!
//! Each stage is a free async function over [`ModelBinding`]s so the
//! orchestrator can compose them in different shapes (single run, deep
//! analysis) without owning any provider itself.
//!
//! [`ModelBinding`]: crate::provider::ModelBinding

pub mod critic;
pub mod cross_exam;
pub mod error;
pub mod generator;
pub mod synthesizer;
pub mod verifier;

pub use critic::critique;
pub use cross_exam::{
    cross_examine, extract_questions, CrossExamPhase, CrossExamination, DefenseRecord,
    TransitionError,
};
pub use error::{PipelineError, PipelineResult, Stage};
pub use generator::{fan_out, FanOut};
pub use synthesizer::{synthesize, SynthesisOutcome};
pub use verifier::{classify, parse_claims, verify_claims, ClaimCheck, ClaimStatus, VerificationReport};
