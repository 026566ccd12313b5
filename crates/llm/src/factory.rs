//! LLM provider factory.
//!
//! Resolves a provider name from configuration into a concrete client.

use crate::client::LlmClient;
use crate::providers::{GeminiClient, OllamaClient};
use crate::types::{ProviderType, DEFAULT_GEMINI_URL, DEFAULT_OLLAMA_URL};
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("gemini", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - API key, required by Gemini
/// * `timeout_secs` - Per-request timeout
///
/// # Errors
/// Returns error if the provider is unknown, a required key is missing,
/// or the HTTP client cannot be built.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    timeout_secs: u64,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;
    let timeout = Duration::from_secs(timeout_secs);
    tracing::debug!(
        "Creating {} client (timeout {}s)",
        provider_type.as_str(),
        timeout_secs
    );

    match provider_type {
        ProviderType::Gemini => {
            let api_key = api_key
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| "Gemini provider requires GOOGLE_API_KEY".to_string())?;
            let base_url = endpoint.unwrap_or(DEFAULT_GEMINI_URL);
            let client = GeminiClient::with_base_url(base_url, api_key, timeout)
                .map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or(DEFAULT_OLLAMA_URL);
            let client =
                OllamaClient::with_base_url(base_url, timeout).map_err(|e| e.to_string())?;
            Ok(Arc::new(client))
        }
    }
}
