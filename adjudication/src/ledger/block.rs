//! The persisted record of one pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;
use crate::types::{Critique, Proposal, Synthesis};

/// Block format version written into every file.
pub const BLOCK_VERSION: &str = env!("CARGO_PKG_VERSION");

const ID_PREFIX: &str = "BLK-";

/// Render a block number as its id (`7` becomes `BLK-0007`).
pub fn block_id(number: u64) -> String {
    format!("{}{:04}", ID_PREFIX, number)
}

/// Parse `BLK-0007` (or a bare `7`) back into a block number.
pub fn parse_block_id(id: &str) -> Option<u64> {
    let digits = id.strip_prefix(ID_PREFIX).unwrap_or(id);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().filter(|n| *n > 0)
}

/// A finished run waiting for the ledger to assign its id.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockDraft {
    pub question: String,
    pub normalized_question: String,
    pub proposals: Vec<Proposal>,
    pub critique: Critique,
    pub synthesis: Synthesis,
    pub metadata: Metrics,
    pub context_refs: Vec<String>,
}

/// One immutable, sequentially numbered pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub question: String,
    pub normalized_question: String,
    pub proposals: Vec<Proposal>,
    pub critique: Critique,
    pub synthesis: Synthesis,
    pub metadata: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_refs: Option<Vec<String>>,
}

impl Block {
    pub(crate) fn from_draft(number: u64, draft: BlockDraft) -> Self {
        Self {
            id: block_id(number),
            version: BLOCK_VERSION.to_string(),
            timestamp: Utc::now(),
            question: draft.question,
            normalized_question: draft.normalized_question,
            proposals: draft.proposals,
            critique: draft.critique,
            synthesis: draft.synthesis,
            metadata: draft.metadata,
            context_refs: if draft.context_refs.is_empty() {
                None
            } else {
                Some(draft.context_refs)
            },
        }
    }

    /// Sequence number encoded in the id.
    pub fn number(&self) -> Option<u64> {
        parse_block_id(&self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_padding() {
        assert_eq!(block_id(1), "BLK-0001");
        assert_eq!(block_id(42), "BLK-0042");
        assert_eq!(block_id(12345), "BLK-12345");
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_block_id("BLK-0007"), Some(7));
        assert_eq!(parse_block_id("12"), Some(12));
        assert_eq!(parse_block_id("BLK-0000"), None);
        assert_eq!(parse_block_id("BLK-../x"), None);
        assert_eq!(parse_block_id(""), None);
    }
}
