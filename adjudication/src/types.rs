//! Core record types shared by every pipeline stage and the block ledger.
//!
//! A run produces one [`Proposal`] per generator, one [`Critique`] and one
//! [`Synthesis`]. All three are created once and never mutated afterwards.

use serde::{Deserialize, Serialize};

/// Prefix of a proposal whose generator call failed.
pub const ERROR_MARKER: &str = "[ERROR]";

/// Role a model played when producing a piece of text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Independent answer to the question.
    Generator,
    /// Adversarial evaluation of all proposals.
    Critic,
    /// Final adjudicated answer.
    Synthesizer,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Generator => write!(f, "generator"),
            Self::Critic => write!(f, "critic"),
            Self::Synthesizer => write!(f, "synthesizer"),
        }
    }
}

/// One generator's answer to the question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Model label (last path segment of the model identifier).
    pub model: String,
    /// Always [`Role::Generator`].
    pub role: Role,
    /// Answer text, or an [`ERROR_MARKER`]-prefixed failure note.
    pub content: String,
    /// Set only by [`Proposal::failed`]; answer text never decides this.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub failed: bool,
}

impl Proposal {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            role: Role::Generator,
            content: content.into(),
            failed: false,
        }
    }

    /// Placeholder for a generator call that failed, kept visible to the
    /// critic and synthesizer so they can discuss the gap.
    pub fn failed(provider: &str, model: impl Into<String>, reason: &str) -> Self {
        Self {
            failed: true,
            ..Self::new(
                model,
                format!("{} {} failed: {}", ERROR_MARKER, provider, reason),
            )
        }
    }

    /// Whether this slot carries a captured failure instead of an answer.
    pub fn is_error(&self) -> bool {
        self.failed
    }
}

/// Adversarial evaluation of all proposals.
///
/// In multi-turn mode `content` holds the full three-round transcript,
/// not only the final verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub model: String,
    pub role: Role,
    pub content: String,
}

impl Critique {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            role: Role::Critic,
            content: content.into(),
        }
    }
}

/// The final adjudicated answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub model: String,
    pub role: Role,
    pub content: String,
}

impl Synthesis {
    pub fn new(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            role: Role::Synthesizer,
            content: content.into(),
        }
    }
}

/// Tokens and estimated cost accumulated over a set of provider calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    pub tokens: u64,
    pub cost_usd: f64,
}

impl Usage {
    pub fn new(tokens: u64, cost_usd: f64) -> Self {
        Self { tokens, cost_usd }
    }
}

impl std::ops::Add for Usage {
    type Output = Usage;

    fn add(self, rhs: Usage) -> Usage {
        Usage {
            tokens: self.tokens + rhs.tokens,
            cost_usd: self.cost_usd + rhs.cost_usd,
        }
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Usage) {
        self.tokens += rhs.tokens;
        self.cost_usd += rhs.cost_usd;
    }
}

/// Short label for a model identifier: `"org/model"` becomes `"model"`.
pub fn model_label(model: &str) -> String {
    model.rsplit('/').next().unwrap_or(model).to_string()
}
