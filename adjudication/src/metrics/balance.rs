//! Synthesis Balance Score: how evenly the synthesis draws on each proposal.

use serde::{Deserialize, Serialize};

use super::text::{round4, word_set, KEYWORD_MIN_LEN};

/// Share above which one proposal dominates the synthesis.
const DOMINANCE_SHARE: f64 = 0.6;
/// Mean share of the other proposals below which dominance is deserved.
const WEAK_OTHERS_SHARE: f64 = 0.15;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceResult {
    /// `1.0` is perfectly even coverage, `0.0` is maximally lopsided.
    pub score: f64,
    /// Per-proposal keyword coverage in the synthesis.
    pub coverage: Vec<f64>,
    /// Coverage normalized to sum to one.
    pub shares: Vec<f64>,
    /// Index of the proposal whose share exceeds 0.6.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominated_by: Option<usize>,
    /// The other proposals were too weak to merit more coverage.
    pub justified: bool,
    /// Dominance without justification.
    pub warning: bool,
}

pub fn compute_balance<S: AsRef<str>>(proposals: &[S], synthesis: &str) -> BalanceResult {
    let slots: Vec<Option<&str>> = proposals.iter().map(|p| Some(p.as_ref())).collect();
    compute_balance_slots(&slots, synthesis)
}

/// Balance over proposal slots where `None` marks a failed generator. A
/// failed slot keeps its index with zero coverage and share and takes no
/// part in the score, so every index lines up with the block's proposals.
pub fn compute_balance_slots(slots: &[Option<&str>], synthesis: &str) -> BalanceResult {
    let live: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.map(|_| i))
        .collect();
    let n = live.len();
    if n == 0 {
        return BalanceResult {
            score: 1.0,
            coverage: vec![0.0; slots.len()],
            shares: vec![0.0; slots.len()],
            dominated_by: None,
            justified: false,
            warning: false,
        };
    }

    let synthesis_words = word_set(synthesis, 0);
    let coverage: Vec<f64> = slots
        .iter()
        .map(|slot| {
            let Some(text) = slot else { return 0.0 };
            let keywords = word_set(text, KEYWORD_MIN_LEN);
            if keywords.is_empty() {
                return 0.0;
            }
            let hit = keywords.iter().filter(|k| synthesis_words.contains(*k)).count();
            hit as f64 / keywords.len() as f64
        })
        .collect();

    let ideal = 1.0 / n as f64;
    let total: f64 = coverage.iter().sum();
    let shares: Vec<f64> = slots
        .iter()
        .zip(&coverage)
        .map(|(slot, c)| match slot {
            None => 0.0,
            Some(_) if total == 0.0 => ideal,
            Some(_) => c / total,
        })
        .collect();

    let mad = live.iter().map(|&i| (shares[i] - ideal).abs()).sum::<f64>() / n as f64;
    let score = (1.0 - mad / ideal).max(0.0);

    // A single answered proposal cannot dominate anything.
    let dominated_by = if n >= 2 {
        shares.iter().position(|&s| s > DOMINANCE_SHARE)
    } else {
        None
    };
    let justified = match dominated_by {
        Some(idx) => {
            let others: f64 = live.iter().filter(|&&i| i != idx).map(|&i| shares[i]).sum();
            others / ((n - 1) as f64) < WEAK_OTHERS_SHARE
        }
        None => false,
    };

    BalanceResult {
        score: round4(score),
        coverage: coverage.into_iter().map(round4).collect(),
        shares: shares.into_iter().map(round4).collect(),
        dominated_by,
        justified,
        warning: dominated_by.is_some() && !justified,
    }
}
