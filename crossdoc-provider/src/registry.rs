//! Builds the provider registry from settings.

use std::sync::Arc;

use crossdoc_core::provider::ProviderRegistry;
use crossdoc_docintel::{DocIntelClient, DocIntelConfig};
use crossdoc_gemini::{GeminiClient, GeminiConfig};
use crossdoc_mistral::{MistralClient, MistralConfig};
use crossdoc_openai::{OpenAiClient, OpenAiConfig};

use crate::adapters::docintel::DocIntelProvider;
use crate::adapters::gemini::GeminiProvider;
use crate::adapters::mistral::MistralProvider;
use crate::adapters::openai::OpenAiProvider;
use crate::errors::Error;
use crate::settings::{Settings, SettingsError};

/// Registers every provider that has credentials.
///
/// Validators without credentials are left out and reported as unavailable
/// at run time; a primary without credentials is an error.
pub fn build_registry(settings: &Settings) -> Result<ProviderRegistry, Error> {
    let mut registry = ProviderRegistry::new();
    let timeout = settings.provider_timeout;

    if let Some(di) = &settings.docintel {
        let mut config = DocIntelConfig::new(&di.endpoint, &di.api_key).with_request_timeout(timeout);
        if let Some(model) = &di.model {
            config = config.with_model(model);
        }
        registry.register(Arc::new(DocIntelProvider::new(DocIntelClient::new(config)?)));
    }

    if let Some(openai) = &settings.openai {
        let mut config = OpenAiConfig::new(&openai.endpoint, &openai.api_key).with_timeout(timeout);
        if let Some(deployment) = &openai.deployment {
            config = config.with_deployment(deployment);
        }
        if let Some(version) = &openai.api_version {
            config = config.with_api_version(version);
        }
        registry.register(Arc::new(OpenAiProvider::new(
            OpenAiClient::new(config)?,
            openai.prompts.clone(),
        )));
    }

    if let Some(gemini) = &settings.gemini {
        let mut config = GeminiConfig::new(&gemini.api_key).with_timeout(timeout);
        if let Some(model) = &gemini.model {
            config = config.with_model(model);
        }
        registry.register(Arc::new(GeminiProvider::new(GeminiClient::new(config)?, &gemini.prompts)));
    }

    if let Some(mistral) = &settings.mistral {
        let mut config = MistralConfig::new(&mistral.api_url, &mistral.api_key).with_timeout(timeout);
        if let Some(model) = &mistral.model {
            config = config.with_model(model);
        }
        registry.register(Arc::new(MistralProvider::new(MistralClient::new(config)?)));
    }

    if !registry.contains(&settings.primary) {
        return Err(SettingsError::PrimaryUnavailable(settings.primary.clone()).into());
    }
    for id in &settings.validators {
        if !registry.contains(id) {
            tracing::warn!(validator = %id, "Validator has no credentials and will be reported unavailable");
        }
    }
    tracing::info!(providers = ?registry.ids(), "Provider registry ready");
    Ok(registry)
}
