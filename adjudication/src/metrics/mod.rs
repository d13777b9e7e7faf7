//! Deterministic text metrics over a finished run.
//!
//! Everything here is a pure function of the proposal, critique and
//! synthesis text. Degenerate inputs (no objections, fewer than two
//! proposals, zero keyword coverage) yield defined fallback values.

pub mod balance;
pub mod convergence;
pub mod diversity;
pub mod dpr;
pub mod text;

use serde::{Deserialize, Serialize};

pub use balance::{compute_balance, compute_balance_slots, BalanceResult};
pub use convergence::{verify_synthesis, SynthesisVerification, VERIFIED_THRESHOLD};
pub use diversity::{dissent_score, model_diversity_index, model_family};
pub use dpr::{compute_dpr, DprResult};

use crate::types::{Critique, Proposal, Synthesis, Usage};
use text::round4;

/// Block metadata: usage, timing and text metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub duration_seconds: f64,
    pub model_diversity_index: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dissent_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpr: Option<DprResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_balance: Option<BalanceResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_verification: Option<SynthesisVerification>,
}

/// Everything the metrics are computed from.
pub struct MetricsInput<'a> {
    pub proposals: &'a [Proposal],
    pub critique: &'a Critique,
    pub synthesis: &'a Synthesis,
    pub usage: Usage,
    pub duration_seconds: f64,
    /// Externally supplied suspected-false-consensus signal.
    pub sas_warning: bool,
    pub verification: Option<SynthesisVerification>,
}

impl Metrics {
    pub fn compute(input: MetricsInput<'_>) -> Self {
        let mut models: Vec<&str> = input.proposals.iter().map(|p| p.model.as_str()).collect();
        models.push(&input.critique.model);
        models.push(&input.synthesis.model);

        // Failed generator slots carry no answer text to compare.
        let answers: Vec<&str> = input
            .proposals
            .iter()
            .filter(|p| !p.is_error())
            .map(|p| p.content.as_str())
            .collect();
        let slots: Vec<Option<&str>> = input
            .proposals
            .iter()
            .map(|p| (!p.is_error()).then_some(p.content.as_str()))
            .collect();

        Self {
            total_tokens: input.usage.tokens,
            total_cost_usd: round_cost(input.usage.cost_usd),
            duration_seconds: (input.duration_seconds * 100.0).round() / 100.0,
            model_diversity_index: round4(model_diversity_index(&models)),
            dissent_score: Some(round4(dissent_score(&answers))),
            dpr: Some(compute_dpr(
                &input.critique.content,
                &input.synthesis.content,
                input.sas_warning,
            )),
            synthesis_balance: Some(compute_balance_slots(&slots, &input.synthesis.content)),
            synthesis_verification: input.verification,
        }
    }
}

fn round_cost(cost: f64) -> f64 {
    (cost * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_ignores_failed_slots_for_text_metrics() {
        let proposals = vec![
            Proposal::new("grok-3", "solar panels everywhere quickly"),
            Proposal::new("kimi-k2", "solar panels everywhere quickly"),
            Proposal::failed("anthropic", "claude-sonnet", "timeout"),
        ];
        let critique = Critique::new("claude-sonnet", "All proposals look reasonable overall.");
        let synthesis = Synthesis::new("claude-sonnet", "Install solar panels everywhere quickly.");
        let metrics = Metrics::compute(MetricsInput {
            proposals: &proposals,
            critique: &critique,
            synthesis: &synthesis,
            usage: Usage::new(1200, 0.0036),
            duration_seconds: 12.346,
            sas_warning: false,
            verification: None,
        });

        assert_eq!(metrics.total_tokens, 1200);
        assert_eq!(metrics.duration_seconds, 12.35);
        assert_eq!(metrics.dissent_score, Some(0.0));
        assert_eq!(metrics.dpr.as_ref().map(|d| d.score), Some(1.0));
        let balance = metrics.synthesis_balance.as_ref().unwrap();
        assert_eq!(balance.shares.len(), 3);
        assert_eq!(balance.shares[2], 0.0);
        // xai, moonshot, anthropic x3
        assert!(metrics.model_diversity_index > 0.0);
    }

    #[test]
    fn test_optional_fields_omitted_from_json() {
        let metrics = Metrics {
            total_tokens: 0,
            total_cost_usd: 0.0,
            duration_seconds: 1.0,
            model_diversity_index: 0.0,
            dissent_score: None,
            dpr: None,
            synthesis_balance: None,
            synthesis_verification: None,
        };
        let json = serde_json::to_string(&metrics).unwrap();
        assert!(!json.contains("dpr"));
        assert!(!json.contains("synthesis_verification"));
    }

    #[test]
    fn test_dominant_proposal_after_failed_slot() {
        let proposals = vec![
            Proposal::failed("xai", "grok-3", "rate limited"),
            Proposal::new("kimi-k2", "nuclear reactors provide baseload electricity reliably"),
            Proposal::new("claude-sonnet", "photovoltaic panels harvest sunlight cheaply"),
        ];
        let critique = Critique::new("claude-sonnet", "Both answers are plausible.");
        let synthesis = Synthesis::new(
            "claude-sonnet",
            "nuclear reactors provide baseload electricity reliably",
        );
        let metrics = Metrics::compute(MetricsInput {
            proposals: &proposals,
            critique: &critique,
            synthesis: &synthesis,
            usage: Usage::default(),
            duration_seconds: 1.0,
            sas_warning: false,
            verification: None,
        });

        let balance = metrics.synthesis_balance.unwrap();
        assert_eq!(balance.shares.len(), proposals.len());
        let idx = balance.dominated_by.unwrap();
        assert_eq!(proposals[idx].model, "kimi-k2");
        assert_eq!(balance.shares[0], 0.0);
    }
}
