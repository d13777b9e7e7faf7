//! Dual-run synthesis verification.

use serde::{Deserialize, Serialize};

use super::text::{jaccard_similarity, round4, word_set, KEYWORD_MIN_LEN};

/// Keyword similarity at or above which two syntheses agree.
pub const VERIFIED_THRESHOLD: f64 = 0.35;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisVerification {
    pub similarity: f64,
    pub verified: bool,
    pub diverged: bool,
    /// Model of the second synthesis, kept only when the runs diverged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_model: Option<String>,
    /// Full text of the second synthesis, kept only when the runs diverged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_synthesis: Option<String>,
}

pub fn verify_synthesis(primary: &str, alternate: &str, alt_model: &str) -> SynthesisVerification {
    let similarity = jaccard_similarity(
        &word_set(primary, KEYWORD_MIN_LEN),
        &word_set(alternate, KEYWORD_MIN_LEN),
    );
    let verified = similarity >= VERIFIED_THRESHOLD;
    SynthesisVerification {
        similarity: round4(similarity),
        verified,
        diverged: !verified,
        alt_model: (!verified).then(|| alt_model.to_string()),
        alt_synthesis: (!verified).then(|| alternate.to_string()),
    }
}
