//! Config file discovery and API key resolution.
//!
//! Lookup order: `--config`, `./verdict.toml`, `$HOME/.verdict.toml`, then
//! built-in defaults. Keys missing from the file are taken from the
//! provider's environment variable. After [`load`] returns nothing else reads
//! the environment.

use std::path::{Path, PathBuf};

use adjudication::config::{PipelineConfig, RoleSpec, Transport};
use anyhow::{Context, Result};
use tracing::{debug, info};

const LOCAL_CONFIG: &str = "verdict.toml";
const HOME_CONFIG: &str = ".verdict.toml";

/// Environment variable holding the key for a provider name.
pub fn key_env_var(provider: &str) -> Option<&'static str> {
    match provider {
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "xai" => Some("XAI_API_KEY"),
        "moonshot" => Some("MOONSHOT_API_KEY"),
        "deepseek" => Some("DEEPSEEK_API_KEY"),
        "perplexity" => Some("PERPLEXITY_API_KEY"),
        _ => None,
    }
}

/// Alternate synthesizer used by `--dual-run` when the file names none.
pub fn default_alt_synthesizer() -> RoleSpec {
    RoleSpec::new("openai", "gpt-4o", Transport::ChatCompletions)
}

/// Search collaborator used by `--verify` when the file names none.
pub fn default_search() -> RoleSpec {
    RoleSpec::new("perplexity", "sonar", Transport::ChatCompletions)
}

fn discover(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(LOCAL_CONFIG);
    if local.is_file() {
        return Some(local);
    }
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(HOME_CONFIG))
        .filter(|p| p.is_file())
}

/// Parse one TOML config file.
pub fn load_file(path: &Path) -> Result<PipelineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file {}", path.display()))
}

/// Fill every role without a key from `lookup(ENV_VAR)`.
pub fn fill_keys(config: &mut PipelineConfig, lookup: impl Fn(&str) -> Option<String>) {
    for role in config.roles_mut() {
        if role.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()) {
            continue;
        }
        if let Some(var) = key_env_var(&role.name) {
            role.api_key = lookup(var).filter(|k| !k.trim().is_empty());
        }
    }
}

/// Optional roles switched on from the command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct Requested {
    pub dual_run: bool,
    pub verify: bool,
}

/// Resolve the pipeline configuration once at startup. Requested roles the
/// file leaves unset get their defaults before keys are filled.
pub fn load(explicit: Option<&Path>, requested: Requested) -> Result<PipelineConfig> {
    let mut config = match discover(explicit) {
        Some(path) => {
            info!(path = %path.display(), "loading config");
            load_file(&path)?
        }
        None => {
            debug!("no config file found, using defaults");
            PipelineConfig::default()
        }
    };
    if requested.dual_run && config.alt_synthesizer.is_none() {
        config.alt_synthesizer = Some(default_alt_synthesizer());
    }
    if requested.verify && config.search.is_none() {
        config.search = Some(default_search());
    }
    fill_keys(&mut config, |var| std::env::var(var).ok());
    Ok(config)
}

fn mask(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 12 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

/// Copy of `config` with every API key masked, for display.
pub fn masked(config: &PipelineConfig) -> PipelineConfig {
    let mut shown = config.clone();
    for role in shown.roles_mut() {
        role.api_key = role.api_key.as_deref().map(mask);
    }
    shown
}
