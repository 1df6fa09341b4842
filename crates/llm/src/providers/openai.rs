//! OpenAI-compatible provider.
//!
//! Talks to `{base}/chat/completions` for chat transcripts and to the legacy
//! `{base}/completions` endpoint for plain prompts. Any server exposing the
//! same API (Ollama's `/v1`, vLLM, LM Studio) works with a custom base URL.

use crate::client::{
    ChatMessage, LlmClient, LlmInput, LlmOutcome, LlmRequest, LlmResponse, LlmUsage,
};
use crate::retry::{RetryPolicy, Retryable};
use quill_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(flatten)]
    sampling: Sampling<'a>,
}

#[derive(Debug, Serialize)]
struct LegacyCompletionBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(flatten)]
    sampling: Sampling<'a>,
}

#[derive(Debug, Serialize)]
struct Sampling<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "no_stops")]
    stop: &'a [String],
}

fn no_stops(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Debug, Deserialize)]
struct CompletionEnvelope {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    /// Chat endpoint
    #[serde(default)]
    message: Option<ChoiceMessage>,
    /// Legacy completion endpoint
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Why a single HTTP attempt failed.
#[derive(Debug, Error)]
enum TransportError {
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("request failed: {0}")]
    Network(String),

    #[error("invalid response body: {0}")]
    Decode(String),

    #[error("could not encode request: {0}")]
    Encode(String),
}

impl Retryable for TransportError {
    fn is_transient(&self) -> bool {
        match self {
            Self::Status { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            Self::Network(_) => true,
            Self::Decode(_) | Self::Encode(_) => false,
        }
    }
}

impl TransportError {
    fn into_outcome(self) -> LlmOutcome {
        let code = match self {
            Self::Status { status, .. } => status.to_string(),
            Self::Network(_) => "network".to_string(),
            Self::Decode(_) => "decode".to_string(),
            Self::Encode(_) => "encode".to_string(),
        };
        LlmOutcome::failure(Some(code), self.to_string())
    }
}

/// Client for OpenAI-compatible HTTP APIs.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
    client: reqwest::Client,
}

impl OpenAiClient {
    /// Client against the hosted OpenAI API.
    pub fn new(api_key: impl Into<String>) -> AppResult<Self> {
        Self::with_base_url(DEFAULT_BASE_URL, Some(api_key.into()))
    }

    /// Client against any OpenAI-compatible base URL (key optional).
    pub fn with_base_url(base_url: impl Into<String>, api_key: Option<String>) -> AppResult<Self> {
        Self::build(base_url.into(), api_key, RetryPolicy::default(), Duration::from_secs(60))
    }

    pub fn build(
        base_url: String,
        api_key: Option<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Llm(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            retry,
            client,
        })
    }

    fn endpoint(&self, input: &LlmInput) -> String {
        match input {
            LlmInput::Messages(_) => format!("{}/chat/completions", self.base_url),
            LlmInput::Prompt(_) => format!("{}/completions", self.base_url),
        }
    }

    fn request_body(request: &LlmRequest) -> Result<serde_json::Value, TransportError> {
        let sampling = Sampling {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stop: &request.stop,
        };

        let body = match &request.input {
            LlmInput::Messages(messages) => serde_json::to_value(ChatCompletionBody {
                model: &request.model,
                messages,
                sampling,
            }),
            LlmInput::Prompt(prompt) => serde_json::to_value(LegacyCompletionBody {
                model: &request.model,
                prompt,
                sampling,
            }),
        };

        body.map_err(|e| TransportError::Encode(e.to_string()))
    }

    fn parse_success(body: &str, requested_model: &str) -> Result<LlmResponse, TransportError> {
        let envelope: CompletionEnvelope =
            serde_json::from_str(body).map_err(|e| TransportError::Decode(e.to_string()))?;

        let choice = envelope
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| TransportError::Decode("response contained no choices".to_string()))?;

        let content = choice
            .message
            .and_then(|m| m.content)
            .or(choice.text)
            .unwrap_or_default();

        let usage = envelope
            .usage
            .map(|u| LlmUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();

        let model = if envelope.model.is_empty() {
            requested_model.to_string()
        } else {
            envelope.model
        };

        Ok(LlmResponse {
            content,
            model,
            usage,
            finish_reason: choice.finish_reason,
        })
    }

    fn error_message(body: &str) -> String {
        serde_json::from_str::<ErrorEnvelope>(body)
            .map(|e| e.error.message)
            .unwrap_or_else(|_| body.trim().to_string())
    }

    async fn attempt(
        &self,
        url: &str,
        body: &serde_json::Value,
        model: &str,
    ) -> Result<LlmResponse, TransportError> {
        let mut builder = self.client.post(url).json(body);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| TransportError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: Self::error_message(&text),
            });
        }

        Self::parse_success(&text, model)
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    fn provider_name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &LlmRequest) -> LlmOutcome {
        let url = self.endpoint(&request.input);
        let body = match Self::request_body(request) {
            Ok(body) => body,
            Err(err) => return err.into_outcome(),
        };

        tracing::info!(model = %request.model, "Sending request to {}", url);
        tracing::debug!("Request body: {}", body);

        match self.retry.run(|| self.attempt(&url, &body, &request.model)).await {
            Ok(response) => {
                tracing::debug!(
                    prompt_tokens = response.usage.prompt_tokens,
                    completion_tokens = response.usage.completion_tokens,
                    "Received completion"
                );
                LlmOutcome::Success(response)
            }
            Err(err) => {
                tracing::warn!("Provider call failed: {}", err);
                err.into_outcome()
            }
        }
    }
}
