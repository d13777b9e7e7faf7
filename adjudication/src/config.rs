//! Pipeline configuration.
//!
//! A [`PipelineConfig`] is resolved once by the caller (the CLI reads it from
//! TOML and fills API keys from the environment) and then passed by value into
//! the orchestrator. Nothing in this crate reads ambient state afterwards.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::provider::CallPolicy;

/// Prompt language.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    De,
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::En => write!(f, "en"),
            Self::De => write!(f, "de"),
        }
    }
}

impl std::str::FromStr for Language {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" => Ok(Self::En),
            "de" | "german" | "deutsch" => Ok(Self::De),
            other => Err(ConfigError::UnknownLanguage(other.to_string())),
        }
    }
}

/// Wire shape used to reach a provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transport {
    /// Bearer-token `/chat/completions` API.
    #[default]
    ChatCompletions,
    /// API-key-header `/v1/messages` API.
    Messages,
}

/// How the critic stage runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriticMode {
    /// One red-team call over all proposals.
    #[default]
    Single,
    /// Interrogation, defense and verdict rounds.
    MultiTurn,
}

impl std::fmt::Display for CriticMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single => write!(f, "single"),
            Self::MultiTurn => write!(f, "multi_turn"),
        }
    }
}

/// One provider + model assignment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleSpec {
    /// Provider name (`anthropic`, `openai`, `xai`, `moonshot`, ...).
    pub name: String,
    pub model: String,
    #[serde(default)]
    pub transport: Transport,
    /// Overrides the provider's default endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl RoleSpec {
    pub fn new(name: impl Into<String>, model: impl Into<String>, transport: Transport) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
            transport,
            base_url: None,
            api_key: None,
        }
    }

    fn same_assignment(&self, other: &RoleSpec) -> bool {
        self.name == other.name && self.model == other.model
    }

    fn validate(&self, role: &str) -> ConfigResult<()> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                role: role.to_string(),
                field: "name",
            });
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                role: role.to_string(),
                field: "model",
            });
        }
        if let Some(url) = &self.base_url {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                return Err(ConfigError::InvalidUrl {
                    role: role.to_string(),
                    url: url.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Errors from configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("at least one generator is required")]
    NoGenerators,

    #[error("{role}: `{field}` must not be empty")]
    EmptyField { role: String, field: &'static str },

    #[error("{role}: invalid base URL `{url}`")]
    InvalidUrl { role: String, url: String },

    #[error("alternate synthesizer must differ from the primary synthesizer")]
    AltSynthesizerNotDistinct,

    #[error("max_claims must be at least 1")]
    NoClaimBudget,

    #[error("deep analysis runs must be between 2 and 5, got {0}")]
    DeepRunsOutOfRange(usize),

    #[error("unknown language `{0}` (expected en or de)")]
    UnknownLanguage(String),
}

/// Result type for configuration checks
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Immutable description of one pipeline: role assignments and policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Ordered generators; proposal `i` comes from `generators[i]`.
    pub generators: Vec<RoleSpec>,
    pub critic: RoleSpec,
    pub synthesizer: RoleSpec,
    /// Second synthesizer; enables dual-run verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt_synthesizer: Option<RoleSpec>,
    /// Search collaborator; enables claim verification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<RoleSpec>,
    pub critic_mode: CriticMode,
    pub language: Language,
    /// Directory holding `BLK-*.json` files.
    pub ledger_path: PathBuf,
    pub call_policy: CallPolicy,
    /// Upper bound on claims extracted for verification.
    pub max_claims: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            generators: vec![
                RoleSpec::new("xai", "grok-3", Transport::ChatCompletions),
                RoleSpec::new("moonshot", "moonshot-v1-32k", Transport::ChatCompletions),
                RoleSpec::new("anthropic", "claude-sonnet-4-20250514", Transport::Messages),
            ],
            critic: RoleSpec::new("anthropic", "claude-sonnet-4-20250514", Transport::Messages),
            synthesizer: RoleSpec::new("anthropic", "claude-sonnet-4-20250514", Transport::Messages),
            alt_synthesizer: None,
            search: None,
            critic_mode: CriticMode::Single,
            language: Language::En,
            ledger_path: PathBuf::from("blocks"),
            call_policy: CallPolicy::default(),
            max_claims: 7,
        }
    }
}

impl PipelineConfig {
    /// Pre-flight check, run before any stage issues a call.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.generators.is_empty() {
            return Err(ConfigError::NoGenerators);
        }
        for (i, spec) in self.generators.iter().enumerate() {
            spec.validate(&format!("generator {}", i + 1))?;
        }
        self.critic.validate("critic")?;
        self.synthesizer.validate("synthesizer")?;
        if let Some(alt) = &self.alt_synthesizer {
            alt.validate("alt_synthesizer")?;
            if alt.same_assignment(&self.synthesizer) {
                return Err(ConfigError::AltSynthesizerNotDistinct);
            }
        }
        if let Some(search) = &self.search {
            search.validate("search")?;
        }
        if self.max_claims == 0 {
            return Err(ConfigError::NoClaimBudget);
        }
        Ok(())
    }

    /// Every role spec, for key filling and availability checks.
    pub fn roles_mut(&mut self) -> impl Iterator<Item = &mut RoleSpec> {
        self.generators
            .iter_mut()
            .chain(std::iter::once(&mut self.critic))
            .chain(std::iter::once(&mut self.synthesizer))
            .chain(self.alt_synthesizer.iter_mut())
            .chain(self.search.iter_mut())
    }
}
