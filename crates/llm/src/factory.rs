//! LLM provider factory.
//!
//! Maps a provider name from configuration onto a client implementation.

use crate::client::LlmClient;
use crate::providers::{openai::DEFAULT_BASE_URL, OpenAiClient, ScriptedClient};
use crate::retry::RetryPolicy;
use quill_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Default base URL of Ollama's OpenAI-compatible API.
pub const OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";

/// Create an LLM client for a provider name.
///
/// * `openai` - hosted API, requires an API key
/// * `ollama` - local Ollama through its OpenAI-compatible endpoint
/// * `echo` - offline client echoing the last input line
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    retry: RetryPolicy,
    timeout: Duration,
) -> AppResult<Arc<dyn LlmClient>> {
    match provider.to_lowercase().as_str() {
        "openai" => {
            let key = api_key
                .ok_or_else(|| AppError::Llm("OpenAI provider requires API key".to_string()))?;
            let base_url = endpoint.unwrap_or(DEFAULT_BASE_URL);
            let client =
                OpenAiClient::build(base_url.to_string(), Some(key.to_string()), retry, timeout)?;
            Ok(Arc::new(client))
        }
        "ollama" => {
            let base_url = endpoint.unwrap_or(OLLAMA_BASE_URL);
            let client = OpenAiClient::build(
                base_url.to_string(),
                api_key.map(str::to_string),
                retry,
                timeout,
            )?;
            Ok(Arc::new(client))
        }
        "echo" => Ok(Arc::new(ScriptedClient::echo())),
        _ => Err(AppError::Llm(format!("Unknown provider: {}", provider))),
    }
}

/// Create the client described by an [`AppConfig`].
pub fn client_from_config(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    let api_key = config.resolve_api_key();
    create_client(
        &config.provider,
        config.endpoint.as_deref(),
        api_key.as_deref(),
        RetryPolicy::with_retries(config.max_retries),
        Duration::from_secs(config.timeout_secs),
    )
}
