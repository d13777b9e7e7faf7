//! Prior-block context for follow-up questions.

use std::str::FromStr;

use super::block::{parse_block_id, Block};
use super::store::{BlockLedger, LedgerError, LedgerResult};

/// Longest synthesis excerpt carried into a new run per block.
const MAX_SYNTHESIS_CHARS: usize = 1500;

/// Which earlier blocks to feed into a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextSelector {
    /// The most recent block.
    Last,
    /// Every block in the ledger.
    All,
    /// Specific block numbers, in the order given.
    Numbers(Vec<u64>),
}

impl FromStr for ContextSelector {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "last" => Ok(Self::Last),
            "all" => Ok(Self::All),
            list => {
                let numbers = list
                    .split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| {
                        parse_block_id(&part.to_uppercase())
                            .ok_or_else(|| LedgerError::InvalidId(part.to_string()))
                    })
                    .collect::<LedgerResult<Vec<_>>>()?;
                if numbers.is_empty() {
                    return Err(LedgerError::InvalidId(s.to_string()));
                }
                Ok(Self::Numbers(numbers))
            }
        }
    }
}

impl ContextSelector {
    /// Load the selected blocks. Missing numbers are skipped.
    pub fn resolve(&self, ledger: &BlockLedger) -> LedgerResult<Vec<Block>> {
        match self {
            Self::Last => {
                let last = ledger.last_number()?;
                if last == 0 {
                    return Ok(Vec::new());
                }
                Ok(ledger.load_many(&[last]))
            }
            Self::All => ledger.list(),
            Self::Numbers(numbers) => Ok(ledger.load_many(numbers)),
        }
    }
}

/// Context text handed to every stage: question and synthesis per block.
pub fn render_context(blocks: &[Block]) -> Option<String> {
    if blocks.is_empty() {
        return None;
    }
    let sections: Vec<String> = blocks
        .iter()
        .map(|b| {
            let mut synthesis: String = b.synthesis.content.chars().take(MAX_SYNTHESIS_CHARS).collect();
            if b.synthesis.content.chars().count() > MAX_SYNTHESIS_CHARS {
                synthesis.push_str(" [...]");
            }
            format!(
                "--- {} ---\nQuestion: {}\nSynthesis:\n{}",
                b.id, b.normalized_question, synthesis
            )
        })
        .collect();
    Some(sections.join("\n\n"))
}
