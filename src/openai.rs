//! OpenAI client configuration with sensible defaults.

use crate::config::ModelSettings;
use crate::error::{ConciergeError, Result};
use async_openai::{config::OpenAIConfig, Client};
use std::time::Duration;

/// Read the API key named by the settings from the environment.
pub fn api_key(settings: &ModelSettings) -> Result<String> {
    match std::env::var(&settings.api_key_env) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        Ok(_) => Err(ConciergeError::Config(format!(
            "{} is empty. Set it with: export {}='sk-...'",
            settings.api_key_env, settings.api_key_env
        ))),
        Err(_) => Err(ConciergeError::Config(format!(
            "{} not set. Set it with: export {}='sk-...'",
            settings.api_key_env, settings.api_key_env
        ))),
    }
}

/// Create an OpenAI-compatible client from model settings.
///
/// Fails with a configuration error when the API key is missing.
pub fn create_client(settings: &ModelSettings) -> Result<Client<OpenAIConfig>> {
    let mut config = OpenAIConfig::new().with_api_key(api_key(settings)?);
    if let Some(base) = &settings.api_base {
        config = config.with_api_base(base);
    }

    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .build()
        .map_err(|e| ConciergeError::Config(format!("Failed to create HTTP client: {}", e)))?;

    Ok(Client::with_config(config).with_http_client(http_client))
}
