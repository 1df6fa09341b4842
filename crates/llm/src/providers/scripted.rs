//! In-memory provider with canned replies.
//!
//! Used by tests and by `--dry-run`. Replies are picked in this order:
//! the first rule whose needle appears in the request text, then the next
//! queued outcome, then the fallback (echo the last input line, or fail).

use crate::client::{LlmClient, LlmInput, LlmOutcome, LlmRequest, LlmResponse, LlmUsage};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fallback {
    Echo,
    Fail,
}

/// Deterministic LLM client that never touches the network.
#[derive(Debug)]
pub struct ScriptedClient {
    name: String,
    rules: Vec<(String, String)>,
    queue: Mutex<VecDeque<LlmOutcome>>,
    requests: Mutex<Vec<LlmRequest>>,
    fallback: Fallback,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl ScriptedClient {
    /// Client that fails every request it has no script for.
    pub fn new() -> Self {
        Self {
            name: "scripted".to_string(),
            rules: Vec::new(),
            queue: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fallback: Fallback::Fail,
        }
    }

    /// Client that answers unscripted requests with the last line of their input.
    pub fn echo() -> Self {
        Self {
            name: "echo".to_string(),
            fallback: Fallback::Echo,
            ..Self::new()
        }
    }

    /// Answer `reply` whenever the request text contains `needle`.
    pub fn when(mut self, needle: impl Into<String>, reply: impl Into<String>) -> Self {
        self.rules.push((needle.into(), reply.into()));
        self
    }

    /// Queue a successful reply.
    pub fn reply(self, content: impl Into<String>) -> Self {
        self.push(success(content.into(), "scripted"));
        self
    }

    /// Queue a failed call.
    pub fn fail(self, code: &str, message: impl Into<String>) -> Self {
        self.push(LlmOutcome::failure(Some(code.to_string()), message));
        self
    }

    /// Queue an arbitrary outcome.
    pub fn push(&self, outcome: LlmOutcome) {
        lock(&self.queue).push_back(outcome);
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<LlmRequest> {
        lock(&self.requests).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.requests).len()
    }

    fn request_text(input: &LlmInput) -> String {
        match input {
            LlmInput::Prompt(prompt) => prompt.clone(),
            LlmInput::Messages(messages) => messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

impl Default for ScriptedClient {
    fn default() -> Self {
        Self::new()
    }
}

fn success(content: String, model: &str) -> LlmOutcome {
    let usage = LlmUsage::new(0, content.split_whitespace().count() as u32);
    LlmOutcome::Success(LlmResponse {
        content,
        model: model.to_string(),
        usage,
        finish_reason: Some("stop".to_string()),
    })
}

#[async_trait::async_trait]
impl LlmClient for ScriptedClient {
    fn provider_name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: &LlmRequest) -> LlmOutcome {
        lock(&self.requests).push(request.clone());
        let text = Self::request_text(&request.input);

        if let Some((needle, reply)) = self.rules.iter().find(|(needle, _)| text.contains(needle.as_str())) {
            tracing::debug!("Scripted rule '{}' matched", needle);
            return success(reply.clone(), &request.model);
        }

        if let Some(outcome) = lock(&self.queue).pop_front() {
            return outcome;
        }

        match self.fallback {
            Fallback::Echo => {
                let last_line = request
                    .input
                    .last_text()
                    .lines()
                    .rev()
                    .find(|line| !line.trim().is_empty())
                    .unwrap_or("")
                    .trim()
                    .to_string();
                success(last_line, &request.model)
            }
            Fallback::Fail => LlmOutcome::failure(
                Some("unscripted".to_string()),
                format!("No scripted reply for request: {}", text),
            ),
        }
    }
}
