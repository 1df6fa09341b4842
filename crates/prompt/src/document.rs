//! Parsed prompt documents.

use crate::element::{join_segments, Element};
use crate::parser::{parse_elements, validate_prompt_count};
use crate::prompt_finder::find_prompt;
use quill_core::{AppError, AppResult};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// An ordered element sequence holding exactly one `Prompt`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    pub(crate) elements: Vec<Element>,

    /// Index of the element written by the most recent resolution step
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) last_resolved: Option<usize>,
}

impl Document {
    /// Parse tag-annotated text.
    ///
    /// # Example
    /// ```
    /// use quill_prompt::Document;
    ///
    /// let doc = Document::parse("<Prompt>Name a color</Prompt><Resolve>Color: </Resolve>").unwrap();
    /// assert_eq!(doc.prompt(), "Name a color");
    /// assert_eq!(doc.unresolved_indices(), vec![1]);
    /// ```
    pub fn parse(input: &str) -> AppResult<Self> {
        Ok(Self {
            elements: parse_elements(input)?,
            last_resolved: None,
        })
    }

    /// Build a document from elements, synthesizing a prompt if needed.
    pub fn from_elements(mut elements: Vec<Element>) -> AppResult<Self> {
        find_prompt(&mut elements);
        validate_prompt_count(&elements)?;
        Ok(Self {
            elements,
            last_resolved: None,
        })
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// The document instruction.
    pub fn prompt(&self) -> &str {
        self.elements
            .iter()
            .find_map(|element| match element {
                Element::Prompt { text } => Some(text.as_str()),
                _ => None,
            })
            .unwrap_or("")
    }

    /// Indices of `Resolve` elements still waiting for generated text.
    pub fn unresolved_indices(&self) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, element)| element.as_resolve().is_some_and(|r| !r.is_resolved()))
            .map(|(index, _)| index)
            .collect()
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.unresolved_indices().is_empty()
    }

    pub fn last_resolved_element(&self) -> Option<&Element> {
        self.last_resolved.and_then(|index| self.elements.get(index))
    }

    /// Text produced by the most recent resolution step.
    pub fn generated_text(&self) -> Option<&str> {
        match self.last_resolved_element()? {
            Element::Resolve(resolve) => resolve.generated_text(),
            Element::Text {
                text,
                is_generated: true,
                ..
            } => Some(text),
            _ => None,
        }
    }

    /// Look up a `Text` element by its `Id` attribute.
    pub fn text_by_id(&self, id: &str) -> Option<&str> {
        self.elements.iter().find_map(|element| match element {
            Element::Text {
                id: Some(element_id),
                text,
                ..
            } if element_id == id => Some(text.as_str()),
            _ => None,
        })
    }

    /// Rendering sent to the model.
    pub fn to_model_input(&self) -> String {
        join_segments(self.elements.iter().map(Element::to_model_input))
    }

    pub(crate) fn element(&self, index: usize) -> AppResult<&Element> {
        self.elements.get(index).ok_or_else(|| {
            AppError::Other(format!(
                "Element index {} out of range for document of {} elements",
                index,
                self.elements.len()
            ))
        })
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = join_segments(
            self.elements
                .iter()
                .map(|element| std::borrow::Cow::Owned(element.to_string())),
        );
        f.write_str(&rendered)
    }
}

impl FromStr for Document {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
