//! Declarative multi-turn dialogs.
//!
//! A chain is an ordered list of [`ChainStep`]s interpreted by
//! [`execute_chain`]. Steps only edit the transcript, except `Send`, which
//! makes one chat call and appends the reply. The first failed `Send` stops
//! the chain.

use crate::client::{ChatMessage, ChatRole, LlmClient, LlmOutcome, LlmRequest};
use serde::{Deserialize, Serialize};

/// One instruction of a dialog chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum ChainStep {
    /// Replace (or insert) the leading system message
    SetSystem(String),
    AddUser(String),
    AddAssistant(String),
    /// Send the transcript and append the assistant reply
    Send,
    /// Drop the last message
    RemoveLast,
    /// Keep only the first `n` messages
    RemoveFrom(usize),
}

/// Sampling settings applied to every `Send`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainOptions {
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl ChainOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
        }
    }
}

/// Transcript and last outcome of an executed chain.
#[derive(Debug, Clone, Serialize)]
pub struct ChainResult {
    pub messages: Vec<ChatMessage>,
    /// Outcome of the last `Send`, or a no-op success when nothing was sent
    pub outcome: LlmOutcome,
    /// Number of `Send` steps that were executed
    pub sends: usize,
}

impl ChainResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }

    /// Content of the last assistant message, if any.
    pub fn last_reply(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.as_str())
    }
}

/// Fluent builder over a list of chain steps.
///
/// ```no_run
/// use quill_llm::{Chain, ChainOptions, ScriptedClient};
///
/// # async fn example() {
/// let client = ScriptedClient::echo();
/// let result = Chain::new()
///     .system("You answer in one word.")
///     .ask("Name a colour.")
///     .ask("Name another.")
///     .run(&client, &ChainOptions::new("gpt-4o-mini"))
///     .await;
/// assert!(result.is_success());
/// # }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Chain {
    steps: Vec<ChainStep>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<ChainStep>) -> Self {
        Self { steps }
    }

    pub fn system(self, content: impl Into<String>) -> Self {
        self.step(ChainStep::SetSystem(content.into()))
    }

    pub fn user(self, content: impl Into<String>) -> Self {
        self.step(ChainStep::AddUser(content.into()))
    }

    pub fn assistant(self, content: impl Into<String>) -> Self {
        self.step(ChainStep::AddAssistant(content.into()))
    }

    pub fn send(self) -> Self {
        self.step(ChainStep::Send)
    }

    /// Add a user message and send it.
    pub fn ask(self, content: impl Into<String>) -> Self {
        self.user(content).send()
    }

    pub fn remove_last(self) -> Self {
        self.step(ChainStep::RemoveLast)
    }

    pub fn remove_from(self, index: usize) -> Self {
        self.step(ChainStep::RemoveFrom(index))
    }

    pub fn step(mut self, step: ChainStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn steps(&self) -> &[ChainStep] {
        &self.steps
    }

    pub async fn run(&self, client: &dyn LlmClient, options: &ChainOptions) -> ChainResult {
        execute_chain(&self.steps, client, options).await
    }
}

/// Interpret `steps` in order against `client`.
pub async fn execute_chain(
    steps: &[ChainStep],
    client: &dyn LlmClient,
    options: &ChainOptions,
) -> ChainResult {
    let mut messages: Vec<ChatMessage> = Vec::new();
    let mut outcome = LlmOutcome::noop();
    let mut sends = 0;

    for (position, step) in steps.iter().enumerate() {
        match step {
            ChainStep::SetSystem(content) => match messages.first_mut() {
                Some(first) if first.role == ChatRole::System => {
                    first.content = content.clone();
                }
                _ => messages.insert(0, ChatMessage::system(content.clone())),
            },
            ChainStep::AddUser(content) => messages.push(ChatMessage::user(content.clone())),
            ChainStep::AddAssistant(content) => {
                messages.push(ChatMessage::assistant(content.clone()))
            }
            ChainStep::RemoveLast => {
                messages.pop();
            }
            ChainStep::RemoveFrom(index) => messages.truncate(*index),
            ChainStep::Send => {
                let mut request = LlmRequest::chat(messages.clone(), options.model.clone());
                request.max_tokens = options.max_tokens;
                request.temperature = options.temperature;

                tracing::debug!(step = position, messages = messages.len(), "Sending chain transcript");
                outcome = client.complete(&request).await;
                sends += 1;

                match outcome {
                    LlmOutcome::Success(ref response) => {
                        messages.push(ChatMessage::assistant(response.content.clone()));
                    }
                    LlmOutcome::Failure(ref failure) => {
                        tracing::warn!(step = position, "Chain aborted: {}", failure);
                        break;
                    }
                }
            }
        }
    }

    ChainResult {
        messages,
        outcome,
        sends,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmInput;
    use crate::providers::ScriptedClient;

    fn options() -> ChainOptions {
        ChainOptions::new("test-model")
    }

    #[tokio::test]
    async fn test_multi_turn_dialog() {
        let client = ScriptedClient::new().reply("Blue").reply("Green");

        let result = Chain::new()
            .system("One word answers.")
            .ask("Name a colour.")
            .ask("Another one.")
            .run(&client, &options())
            .await;

        assert!(result.is_success());
        assert_eq!(result.sends, 2);
        assert_eq!(result.messages.len(), 5);
        assert_eq!(result.last_reply(), Some("Green"));

        let requests = client.requests();
        match &requests[1].input {
            LlmInput::Messages(sent) => {
                assert_eq!(sent.len(), 4);
                assert_eq!(sent[2], ChatMessage::assistant("Blue"));
            }
            other => panic!("expected chat input, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failure_aborts_remaining_steps() {
        let client = ScriptedClient::new().fail("503", "overloaded").reply("never");

        let result = Chain::new()
            .ask("first")
            .ask("second")
            .run(&client, &options())
            .await;

        assert!(!result.is_success());
        assert_eq!(result.sends, 1);
        assert_eq!(client.call_count(), 1);
        assert_eq!(result.messages, vec![ChatMessage::user("first")]);
    }

    #[tokio::test]
    async fn test_no_send_is_noop_success() {
        let client = ScriptedClient::new();
        let result = Chain::new().user("hello").run(&client, &options()).await;

        assert!(result.is_success());
        assert_eq!(result.outcome.text(), "");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_transcript_editing_steps() {
        let client = ScriptedClient::new();
        let result = Chain::new()
            .user("a")
            .assistant("b")
            .system("first system")
            .user("c")
            .system("second system")
            .remove_last()
            .user("d")
            .remove_from(3)
            .run(&client, &options())
            .await;

        assert_eq!(
            result.messages,
            vec![
                ChatMessage::system("second system"),
                ChatMessage::user("a"),
                ChatMessage::assistant("b"),
            ]
        );
    }

    #[test]
    fn test_chain_from_yaml() {
        let yaml = r#"
- op: set_system
  value: Be terse.
- op: add_user
  value: Hi
- op: send
- op: remove_from
  value: 1
"#;
        let chain: Chain = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            chain.steps(),
            &[
                ChainStep::SetSystem("Be terse.".to_string()),
                ChainStep::AddUser("Hi".to_string()),
                ChainStep::Send,
                ChainStep::RemoveFrom(1),
            ]
        );
    }
}
