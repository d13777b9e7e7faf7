//! Role assignments resolved into callable bindings.

use std::sync::Arc;

use tracing::debug;

use super::chat_completions::ChatCompletionsProvider;
use super::dry_run::DryRunProvider;
use super::error::{ProviderError, ProviderResult};
use super::guarded::{CallPolicy, GuardedProvider};
use super::messages::MessagesProvider;
use super::{ModelBinding, SharedProvider};
use crate::config::{PipelineConfig, RoleSpec, Transport};

/// One binding per pipeline role.
#[derive(Debug, Clone)]
pub struct ProviderSet {
    pub generators: Vec<ModelBinding>,
    pub critic: ModelBinding,
    pub synthesizer: ModelBinding,
    pub alt_synthesizer: Option<ModelBinding>,
    pub search: Option<ModelBinding>,
}

fn build_transport(spec: &RoleSpec) -> ProviderResult<SharedProvider> {
    let provider: SharedProvider = match spec.transport {
        Transport::ChatCompletions => Arc::new(ChatCompletionsProvider::new(
            spec.name.clone(),
            spec.api_key.clone(),
            spec.base_url.clone(),
        )?),
        Transport::Messages => Arc::new(MessagesProvider::new(
            spec.name.clone(),
            spec.api_key.clone(),
            spec.base_url.clone(),
        )?),
    };
    Ok(provider)
}

fn guarded(spec: &RoleSpec, policy: CallPolicy) -> ProviderResult<ModelBinding> {
    let inner = build_transport(spec)?;
    debug!(provider = %spec.name, model = %spec.model, transport = ?spec.transport, "binding role");
    Ok(ModelBinding::new(
        Arc::new(GuardedProvider::new(inner, policy)),
        spec.model.clone(),
    ))
}

fn offline(spec: &RoleSpec) -> ModelBinding {
    ModelBinding::new(Arc::new(DryRunProvider::new(spec.name.clone())), spec.model.clone())
}

impl ProviderSet {
    /// Build guarded network transports for every configured role.
    pub fn from_config(config: &PipelineConfig) -> ProviderResult<Self> {
        let policy = config.call_policy;
        Ok(Self {
            generators: config
                .generators
                .iter()
                .map(|spec| guarded(spec, policy))
                .collect::<ProviderResult<Vec<_>>>()?,
            critic: guarded(&config.critic, policy)?,
            synthesizer: guarded(&config.synthesizer, policy)?,
            alt_synthesizer: config
                .alt_synthesizer
                .as_ref()
                .map(|spec| guarded(spec, policy))
                .transpose()?,
            search: config
                .search
                .as_ref()
                .map(|spec| guarded(spec, policy))
                .transpose()?,
        })
    }

    /// Offline bindings with the same role layout as `config`.
    pub fn dry_run(config: &PipelineConfig) -> Self {
        Self {
            generators: config.generators.iter().map(offline).collect(),
            critic: offline(&config.critic),
            synthesizer: offline(&config.synthesizer),
            alt_synthesizer: config.alt_synthesizer.as_ref().map(offline),
            search: config.search.as_ref().map(offline),
        }
    }

    fn all(&self) -> impl Iterator<Item = &ModelBinding> {
        self.generators
            .iter()
            .chain(std::iter::once(&self.critic))
            .chain(std::iter::once(&self.synthesizer))
            .chain(self.alt_synthesizer.iter())
            .chain(self.search.iter())
    }

    /// Credential pre-check. Fails on the first role whose provider has no
    /// key, before any network call is made.
    pub fn ensure_available(&self) -> ProviderResult<()> {
        match self.all().find(|b| !b.is_available()) {
            Some(binding) => Err(ProviderError::Unavailable {
                provider: binding.provider_name().to_string(),
            }),
            None => Ok(()),
        }
    }
}
