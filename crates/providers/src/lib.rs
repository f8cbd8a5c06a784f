//! Chat-completion client implementations for Reflexa.
//!
//! All clients implement the `reflexa_core::CompletionClient` trait.
//! [`build_from_config`] turns an [`AppConfig`] into a ready client.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatClient;

use std::time::Duration;

use reflexa_config::AppConfig;
use reflexa_core::error::CompletionError;

/// Build the completion client described by `config`.
///
/// Fails with [`CompletionError::NotConfigured`] when no API key is set;
/// the credential must come from the config file or the environment.
pub fn build_from_config(config: &AppConfig) -> Result<OpenAiCompatClient, CompletionError> {
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| {
            CompletionError::NotConfigured(
                "no API key (set REFLEXA_API_KEY or GROQ_API_KEY, or api_key in config.toml)"
                    .into(),
            )
        })?;

    OpenAiCompatClient::new(
        provider_name(&config.api_url),
        &config.api_url,
        api_key,
        Duration::from_secs(config.timeout_secs),
    )
}

/// Derive a short client name from well-known base URLs.
fn provider_name(api_url: &str) -> &'static str {
    if api_url.contains("api.groq.com") {
        "groq"
    } else if api_url.contains("api.openai.com") {
        "openai"
    } else if api_url.contains("openrouter.ai") {
        "openrouter"
    } else if api_url.contains("localhost:11434") {
        "ollama"
    } else {
        "custom"
    }
}
