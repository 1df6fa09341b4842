//! Document elements.
//!
//! A document is a flat sequence of three element kinds: the single
//! `Prompt` instruction, literal `Text`, and `Resolve` placeholders whose
//! text is produced by a model call.

use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// One node of a parsed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// The document's instruction
    Prompt { text: String },

    /// Literal content, authored or generated
    Text {
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        text: String,
        is_generated: bool,
    },

    /// Placeholder filled by a model call
    Resolve(ResolveElement),
}

impl Element {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self::Prompt { text: text.into() }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            id: None,
            text: text.into(),
            is_generated: false,
        }
    }

    /// Text produced by a model call.
    pub fn generated(text: impl Into<String>) -> Self {
        Self::Text {
            id: None,
            text: text.into(),
            is_generated: true,
        }
    }

    pub fn resolve(prompt: Option<String>, content: impl Into<String>) -> Self {
        Self::Resolve(ResolveElement::new(prompt, content))
    }

    pub fn is_prompt(&self) -> bool {
        matches!(self, Self::Prompt { .. })
    }

    pub fn as_resolve(&self) -> Option<&ResolveElement> {
        match self {
            Self::Resolve(resolve) => Some(resolve),
            _ => None,
        }
    }

    /// Text sent to the model for this element.
    pub fn to_model_input(&self) -> Cow<'_, str> {
        match self {
            Self::Prompt { text } | Self::Text { text, .. } => Cow::Borrowed(text),
            Self::Resolve(resolve) => resolve.to_model_input(),
        }
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Prompt { text } | Self::Text { text, .. } => f.write_str(text),
            Self::Resolve(resolve) => resolve.fmt(f),
        }
    }
}

/// A `Resolve` placeholder.
///
/// Resolution happens once: `generated_text` is `Some` exactly when the
/// element is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveElement {
    /// Replaces the document prompt while this element is resolved
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Literal text placed before the generated text
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    generated_text: Option<String>,
}

impl ResolveElement {
    pub fn new(prompt: Option<String>, content: impl Into<String>) -> Self {
        Self {
            prompt,
            content: content.into(),
            generated_text: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.generated_text.is_some()
    }

    pub fn generated_text(&self) -> Option<&str> {
        self.generated_text.as_deref()
    }

    pub(crate) fn mark_resolved(&mut self, generated: String) {
        self.generated_text = Some(generated);
    }

    /// Rendering with an explicit generated text (used by workspaces).
    pub(crate) fn render_with<'a>(&'a self, generated: Option<&str>) -> Cow<'a, str> {
        match generated {
            Some(generated) => Cow::Owned(format!("{}{}", self.content, generated)),
            None if !self.content.is_empty() => Cow::Borrowed(&self.content),
            None => Cow::Borrowed(self.prompt.as_deref().unwrap_or("")),
        }
    }

    /// Model-facing rendering. Currently identical to `Display`.
    pub fn to_model_input(&self) -> Cow<'_, str> {
        self.render_with(self.generated_text())
    }
}

impl fmt::Display for ResolveElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(self.generated_text()))
    }
}

/// Concatenate rendered elements, adding a newline where two non-empty
/// pieces would otherwise run together on one line.
pub(crate) fn join_segments<'a, I>(segments: I) -> String
where
    I: IntoIterator<Item = Cow<'a, str>>,
{
    let mut out = String::new();
    for segment in segments {
        if segment.is_empty() {
            continue;
        }
        if !out.is_empty() && !out.ends_with('\n') && !segment.starts_with('\n') {
            out.push('\n');
        }
        out.push_str(&segment);
    }
    out
}
