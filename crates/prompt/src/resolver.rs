//! Recursive resolution of `Resolve` elements.
//!
//! Each `Resolve` element is answered by a model call over a *workspace*:
//! the elements before it, with the document prompt swapped for the
//! element's own prompt and the element's content appended as a trailing
//! cue. Unresolved elements inside a workspace are resolved first, depth
//! first, writing only to the workspace's overlay so the document itself
//! changes one element at a time.

use crate::document::Document;
use crate::element::{join_segments, Element};
use futures::future::{BoxFuture, FutureExt};
use quill_core::{AppError, AppResult};
use quill_llm::{ChatMessage, LlmClient, LlmOutcome, LlmRequest};
use std::borrow::Cow;

/// Settings for one resolution run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,

    /// Stop after the first element completes
    pub halt_after_first_complete: bool,

    /// Send the fully resolved document for a final completion
    pub submit_result_for_completion: bool,

    /// Send rendered text as one user chat message instead of a raw prompt
    pub as_chat: bool,
}

impl ResolveOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: None,
            temperature: None,
            halt_after_first_complete: false,
            submit_result_for_completion: false,
            as_chat: true,
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

    pub fn halt_after_first_complete(mut self, halt: bool) -> Self {
        self.halt_after_first_complete = halt;
        self
    }

    pub fn submit_result_for_completion(mut self, submit: bool) -> Self {
        self.submit_result_for_completion = submit;
        self
    }

    pub fn as_chat(mut self, as_chat: bool) -> Self {
        self.as_chat = as_chat;
        self
    }

    fn request(&self, text: String) -> LlmRequest {
        let mut request = if self.as_chat {
            LlmRequest::chat(vec![ChatMessage::user(text)], self.model.clone())
        } else {
            LlmRequest::prompt(text, self.model.clone())
        };
        request.max_tokens = self.max_tokens;
        request.temperature = self.temperature;
        request
    }

    /// Workspaces resolve everything and always submit.
    fn for_workspace(&self) -> Self {
        Self {
            halt_after_first_complete: false,
            submit_result_for_completion: true,
            ..self.clone()
        }
    }
}

/// A borrowed prefix of a document's elements plus local state.
struct Workspace<'a> {
    elements: &'a [Element],
    generated: Vec<Option<Cow<'a, str>>>,
    prompt: Option<&'a str>,
    /// Document prompt, used when the prefix holds no `Prompt` element
    document_prompt: Option<&'a str>,
    trailing: Option<&'a str>,
}

impl<'a> Workspace<'a> {
    fn of(elements: &'a [Element]) -> Self {
        Self {
            elements,
            generated: elements
                .iter()
                .map(|element| {
                    element
                        .as_resolve()
                        .and_then(|resolve| resolve.generated_text())
                        .map(Cow::Borrowed)
                })
                .collect(),
            prompt: None,
            document_prompt: elements.iter().find_map(|element| match element {
                Element::Prompt { text } => Some(text.as_str()),
                _ => None,
            }),
            trailing: None,
        }
    }

    /// Workspace for the `Resolve` element at `index`.
    fn child(&self, index: usize) -> Workspace<'_> {
        let resolve = self.elements[index].as_resolve();
        let prompt = resolve
            .and_then(|resolve| resolve.prompt.as_deref())
            .or(self.prompt);
        let trailing = resolve
            .map(|resolve| resolve.content.as_str())
            .filter(|content| !content.is_empty());

        Workspace {
            elements: &self.elements[..index],
            generated: self.generated[..index]
                .iter()
                .map(|text| text.as_deref().map(Cow::Borrowed))
                .collect(),
            prompt,
            document_prompt: self.document_prompt,
            trailing,
        }
    }

    fn unresolved(&self) -> Vec<usize> {
        self.elements
            .iter()
            .zip(&self.generated)
            .enumerate()
            .filter(|(_, (element, generated))| element.as_resolve().is_some() && generated.is_none())
            .map(|(index, _)| index)
            .collect()
    }

    fn to_model_input(&self) -> String {
        let body = self
            .elements
            .iter()
            .zip(&self.generated)
            .map(|(element, generated)| match element {
                Element::Prompt { text } => Cow::Borrowed(self.prompt.unwrap_or(text.as_str())),
                Element::Resolve(resolve) => resolve.render_with(generated.as_deref()),
                other => other.to_model_input(),
            });
        // A prefix cut before the `Prompt` element still leads with the prompt.
        let lead = if self.elements.iter().any(Element::is_prompt) {
            None
        } else {
            self.prompt.or(self.document_prompt)
        };
        join_segments(
            lead.map(Cow::Borrowed)
                .into_iter()
                .chain(body)
                .chain(self.trailing.map(Cow::Borrowed)),
        )
    }
}

/// Resolve everything inside a workspace, then submit its rendering.
fn resolve_and_submit<'w, 'a: 'w>(
    workspace: &'w mut Workspace<'a>,
    client: &'w dyn LlmClient,
    options: &'w ResolveOptions,
    depth: usize,
) -> BoxFuture<'w, LlmOutcome> {
    async move {
        for index in workspace.unresolved() {
            tracing::debug!(depth, index, "Resolving nested element");
            let outcome = {
                let mut child = workspace.child(index);
                resolve_and_submit(&mut child, client, options, depth + 1).await
            };
            match outcome {
                LlmOutcome::Success(response) => {
                    workspace.generated[index] = Some(Cow::Owned(response.content));
                }
                failure => return failure,
            }
        }

        let input = workspace.to_model_input();
        tracing::trace!(depth, chars = input.len(), "Submitting workspace");
        client.complete(&options.request(input)).await
    }
    .boxed()
}

impl Document {
    /// Resolve every unresolved `Resolve` element in order.
    ///
    /// Stops at the first failure and returns it, leaving that element and
    /// everything after it unresolved. With `halt_after_first_complete` only
    /// the first element is processed. With `submit_result_for_completion`
    /// the resolved document is sent once more and the reply is appended as
    /// a generated `Text` element. Returns a no-op success when nothing was
    /// left to do.
    pub async fn resolve(&mut self, client: &dyn LlmClient, options: &ResolveOptions) -> LlmOutcome {
        let pending = self.unresolved_indices();
        tracing::info!(
            provider = client.provider_name(),
            pending = pending.len(),
            "Resolving document"
        );

        let mut last = None;
        for index in pending {
            let outcome = self.resolve_at(index, client, options).await;
            if let Some(failure) = outcome.failure_detail() {
                tracing::warn!(index, error = %failure, "Resolution failed");
                return outcome;
            }
            last = Some(outcome);
            if options.halt_after_first_complete {
                return last.unwrap_or_else(LlmOutcome::noop);
            }
        }

        if options.submit_result_for_completion {
            let outcome = client.complete(&options.request(self.to_model_input())).await;
            if let LlmOutcome::Success(ref response) = outcome {
                self.elements.push(Element::generated(response.content.clone()));
                self.last_resolved = Some(self.elements.len() - 1);
            }
            return outcome;
        }

        last.unwrap_or_else(LlmOutcome::noop)
    }

    /// Resolve the single `Resolve` element at `index`.
    ///
    /// Earlier unresolved elements are answered inside the workspace only.
    /// An already resolved element yields a no-op success without a call.
    pub async fn resolve_element(
        &mut self,
        index: usize,
        client: &dyn LlmClient,
        options: &ResolveOptions,
    ) -> AppResult<LlmOutcome> {
        let already_resolved = match self.element(index)? {
            Element::Resolve(resolve) => resolve.is_resolved(),
            _ => {
                return Err(AppError::Other(format!(
                    "Element {} is not a Resolve element",
                    index
                )))
            }
        };
        if already_resolved {
            return Ok(LlmOutcome::noop());
        }
        Ok(self.resolve_at(index, client, options).await)
    }

    async fn resolve_at(
        &mut self,
        index: usize,
        client: &dyn LlmClient,
        options: &ResolveOptions,
    ) -> LlmOutcome {
        let workspace_options = options.for_workspace();
        let outcome = {
            let root = Workspace::of(&self.elements);
            let mut workspace = root.child(index);
            resolve_and_submit(&mut workspace, client, &workspace_options, 1).await
        };

        if let LlmOutcome::Success(ref response) = outcome {
            if let Some(Element::Resolve(resolve)) = self.elements.get_mut(index) {
                resolve.mark_resolved(response.content.clone());
                self.last_resolved = Some(index);
                tracing::debug!(index, "Element resolved");
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quill_llm::ScriptedClient;

    const STORY: &str = "<Prompt>Write a short story outline.</Prompt>\n\
<Text>The story is about a lighthouse keeper.</Text>\n\
<Resolve Prompt=\"Give the keeper a name.\">Name: </Resolve>\n\
<Resolve Prompt=\"Describe the lighthouse in one sentence.\">Setting: </Resolve>";

    fn story_client() -> ScriptedClient {
        ScriptedClient::new()
            .when("Give the keeper a name.", "Ada")
            .when("Describe the lighthouse", "A white tower on a cliff.")
    }

    fn options() -> ResolveOptions {
        ResolveOptions::new("test-model")
    }

    #[tokio::test]
    async fn test_resolve_all_elements_in_order() {
        let client = story_client();
        let mut doc = Document::parse(STORY).unwrap();

        let outcome = doc.resolve(&client, &options()).await;
        assert!(outcome.is_success());
        assert_eq!(outcome.text(), "A white tower on a cliff.");
        assert!(doc.is_fully_resolved());
        assert_eq!(doc.generated_text(), Some("A white tower on a cliff."));

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(
            requests[0].input.last_text(),
            "Give the keeper a name.\nThe story is about a lighthouse keeper.\nName: "
        );
        assert_eq!(
            requests[1].input.last_text(),
            "Describe the lighthouse in one sentence.\nThe story is about a lighthouse keeper.\nName: Ada\nSetting: "
        );

        assert_eq!(
            doc.to_string(),
            "Write a short story outline.\nThe story is about a lighthouse keeper.\nName: Ada\nSetting: A white tower on a cliff."
        );
    }

    #[tokio::test]
    async fn test_halt_after_first_complete() {
        let client = story_client();
        let mut doc = Document::parse(STORY).unwrap();

        let outcome = doc
            .resolve(&client, &options().halt_after_first_complete(true))
            .await;

        assert_eq!(outcome.text(), "Ada");
        assert_eq!(client.call_count(), 1);
        assert_eq!(doc.unresolved_indices(), vec![6]);
        assert_eq!(doc.generated_text(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_failure_stops_resolution() {
        let client = ScriptedClient::new().fail("429", "rate limited");
        let mut doc = Document::parse(STORY).unwrap();

        let outcome = doc.resolve(&client, &options()).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.failure_detail().and_then(|f| f.code.as_deref()), Some("429"));
        assert_eq!(client.call_count(), 1);
        assert_eq!(doc.unresolved_indices(), vec![4, 6]);
        assert!(doc.generated_text().is_none());
    }

    #[tokio::test]
    async fn test_nested_resolution_is_depth_first() {
        let client = story_client();
        let mut doc = Document::parse(STORY).unwrap();

        let outcome = doc.resolve_element(6, &client, &options()).await.unwrap();
        assert_eq!(outcome.text(), "A white tower on a cliff.");

        // The earlier element was answered inside the workspace only.
        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].input.last_text().starts_with("Give the keeper a name."));
        assert!(requests[1].input.last_text().contains("Name: Ada\nSetting: "));
        assert_eq!(doc.unresolved_indices(), vec![4]);

        let outcome = doc.resolve(&client, &options()).await;
        assert_eq!(outcome.text(), "Ada");
        assert!(doc.is_fully_resolved());
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_resolve_without_prompt_attribute_uses_document_prompt() {
        let client = ScriptedClient::echo();
        let mut doc = Document::parse("<Prompt>Reply with the last line</Prompt>\n<Resolve>echo me</Resolve>").unwrap();

        let outcome = doc.resolve(&client, &options()).await;
        assert_eq!(outcome.text(), "echo me");
        assert_eq!(
            client.requests()[0].input.last_text(),
            "Reply with the last line\necho me"
        );
        assert_eq!(doc.to_string(), "Reply with the last line\necho meecho me");
    }

    #[tokio::test]
    async fn test_resolve_before_prompt_element_keeps_prompt() {
        let client = ScriptedClient::echo();
        let mut doc = Document::parse(
            "<Resolve Prompt=\"Name a color\"/>\n<Resolve>Shade: </Resolve>\n<Prompt>Write a poem</Prompt>",
        )
        .unwrap();

        let outcome = doc.resolve(&client, &options()).await;
        assert!(outcome.is_success());

        let requests = client.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].input.last_text(), "Name a color");
        assert_eq!(
            requests[1].input.last_text(),
            "Write a poem\nName a color\nShade: "
        );
        assert!(doc.is_fully_resolved());
    }

    #[tokio::test]
    async fn test_submit_result_appends_generated_text() {
        let client = story_client().when("Write a short story outline.", "Outline done.");
        let mut doc = Document::parse(STORY).unwrap();

        let outcome = doc
            .resolve(&client, &options().submit_result_for_completion(true))
            .await;

        assert_eq!(outcome.text(), "Outline done.");
        assert_eq!(client.call_count(), 3);
        assert_eq!(doc.generated_text(), Some("Outline done."));
        assert!(matches!(
            doc.elements().last(),
            Some(Element::Text { is_generated: true, .. })
        ));
    }

    #[tokio::test]
    async fn test_nothing_to_resolve_is_noop() {
        let client = ScriptedClient::new();
        let mut doc = Document::parse("<Prompt>p</Prompt><Text>t</Text>").unwrap();

        let outcome = doc.resolve(&client, &options()).await;
        assert!(outcome.is_success());
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_resolve_element_rejects_other_elements() {
        let client = ScriptedClient::echo();
        let mut doc = Document::parse(STORY).unwrap();

        assert!(doc.resolve_element(0, &client, &options()).await.is_err());
        assert!(doc.resolve_element(99, &client, &options()).await.is_err());
        assert_eq!(client.call_count(), 0);
    }

    #[test]
    fn test_request_shape() {
        let chat = options().with_max_tokens(64).request("hello".to_string());
        assert_eq!(chat.max_tokens, Some(64));
        assert_eq!(chat.input.last_text(), "hello");

        let legacy = options().as_chat(false).request("hello".to_string());
        assert!(matches!(legacy.input, quill_llm::LlmInput::Prompt(_)));
    }
}
