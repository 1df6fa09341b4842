//! The LLM collaborator contract.
//!
//! Everything above this module (document resolution, dialog chains) only
//! sees [`LlmClient::complete`] and the [`LlmOutcome`] it returns. A failed
//! call is a value, not an error, so callers check [`LlmOutcome::is_success`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One message of a chat transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// What gets sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmInput {
    /// Rendered prompt text for the legacy completion endpoint
    Prompt(String),
    /// Chat transcript for the chat endpoint
    Messages(Vec<ChatMessage>),
}

impl LlmInput {
    /// Last piece of text in the input, used for logging and echoing.
    pub fn last_text(&self) -> &str {
        match self {
            Self::Prompt(prompt) => prompt,
            Self::Messages(messages) => messages.last().map(|m| m.content.as_str()).unwrap_or(""),
        }
    }
}

/// LLM completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    /// Prompt text or chat transcript
    pub input: LlmInput,

    /// Model identifier, passed through untouched
    pub model: String,

    /// Maximum tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Temperature for sampling (0.0 - 2.0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Top-p nucleus sampling
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,

    /// Stop sequences
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl LlmRequest {
    /// Request against the legacy completion endpoint.
    pub fn prompt(prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self::new(LlmInput::Prompt(prompt.into()), model)
    }

    /// Request against the chat endpoint.
    pub fn chat(messages: Vec<ChatMessage>, model: impl Into<String>) -> Self {
        Self::new(LlmInput::Messages(messages), model)
    }

    pub fn new(input: LlmInput, model: impl Into<String>) -> Self {
        Self {
            input,
            model: model.into(),
            max_tokens: None,
            temperature: None,
            top_p: None,
            stop: Vec::new(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_stop(mut self, stop: impl Into<String>) -> Self {
        self.stop.push(stop.into());
        self
    }
}

/// A successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    /// The generated text
    pub content: String,

    /// Model that generated the response
    pub model: String,

    /// Usage statistics
    pub usage: LlmUsage,

    /// Provider-reported stop reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct LlmUsage {
    #[serde(default)]
    pub prompt_tokens: u32,

    #[serde(default)]
    pub completion_tokens: u32,

    #[serde(default)]
    pub total_tokens: u32,
}

impl LlmUsage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A failed model call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmFailure {
    /// HTTP status or provider error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    pub message: String,
}

impl LlmFailure {
    pub fn new(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for LlmFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(ref code) => write!(f, "[{}] {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Result of one model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum LlmOutcome {
    Success(LlmResponse),
    Failure(LlmFailure),
}

impl LlmOutcome {
    /// Success with no content, returned when a pipeline had nothing to do.
    pub fn noop() -> Self {
        Self::Success(LlmResponse {
            content: String::new(),
            model: String::new(),
            usage: LlmUsage::default(),
            finish_reason: None,
        })
    }

    pub fn failure(code: Option<String>, message: impl Into<String>) -> Self {
        Self::Failure(LlmFailure::new(code, message))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Generated text, empty on failure.
    pub fn text(&self) -> &str {
        match self {
            Self::Success(response) => &response.content,
            Self::Failure(_) => "",
        }
    }

    pub fn usage(&self) -> LlmUsage {
        match self {
            Self::Success(response) => response.usage,
            Self::Failure(_) => LlmUsage::default(),
        }
    }

    pub fn failure_detail(&self) -> Option<&LlmFailure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }
}

/// Trait for LLM providers.
///
/// Implementations own transport, authentication and retries; callers only
/// ever see the final outcome of a call.
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name (e.g., "openai", "echo").
    fn provider_name(&self) -> &str;

    /// Submit a prompt or chat transcript and wait for the final outcome.
    async fn complete(&self, request: &LlmRequest) -> LlmOutcome;
}
