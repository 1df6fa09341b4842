//! LLM integration crate for quill.
//!
//! Defines the single collaborator contract the rest of quill depends on
//! ([`LlmClient`]), an OpenAI-compatible HTTP provider, an offline scripted
//! provider, retry policy, and the dialog chain interpreter.
//!
//! # Example
//! ```no_run
//! use quill_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...")?;
//! let outcome = client.complete(&LlmRequest::prompt("Say hello", "gpt-3.5-turbo-instruct")).await;
//! if outcome.is_success() {
//!     println!("{}", outcome.text());
//! }
//! # Ok(())
//! # }
//! ```

pub mod chain;
pub mod client;
pub mod factory;
pub mod providers;
pub mod retry;

// Re-export main types
pub use chain::{execute_chain, Chain, ChainOptions, ChainResult, ChainStep};
pub use client::{
    ChatMessage, ChatRole, LlmClient, LlmFailure, LlmInput, LlmOutcome, LlmRequest, LlmResponse,
    LlmUsage,
};
pub use factory::{client_from_config, create_client};
pub use providers::{OpenAiClient, ScriptedClient};
pub use retry::RetryPolicy;
