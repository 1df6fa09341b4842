//! Tag scanner turning annotated text into document elements.
//!
//! Recognized tags are `<Prompt>`, `<Text>` and `<Resolve>` (names are
//! case-insensitive), each either paired or self-closing. Tags do not nest.
//! Free text between tags becomes `Text`.

use crate::element::Element;
use crate::prompt_finder::find_prompt;
use quill_core::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"<\s*(/)?\s*([A-Za-z][\w-]*)((?:\s+[A-Za-z_][\w-]*\s*=\s*(?:"[^"]*"|'[^']*'))*)\s*(/)?\s*>"#,
    )
    .expect("tag pattern is valid")
});

static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TagKind {
    Prompt,
    Text,
    Resolve,
}

impl TagKind {
    fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "prompt" => Some(Self::Prompt),
            "text" => Some(Self::Text),
            "resolve" => Some(Self::Resolve),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Prompt => "Prompt",
            Self::Text => "Text",
            Self::Resolve => "Resolve",
        }
    }
}

/// A tag occurrence found by the scanner.
#[derive(Debug)]
struct Tag {
    kind: TagKind,
    attributes: Vec<(String, String)>,
    start: usize,
}

impl Tag {
    fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

enum ScanState {
    Outside,
    Open { tag: Tag, content_start: usize },
}

/// Parse annotated text into a validated element list.
///
/// The result holds exactly one `Prompt`; when none was tagged, the first
/// non-blank line of a leading `Text` element is promoted.
pub fn parse_elements(input: &str) -> AppResult<Vec<Element>> {
    let mut elements = scan(input)?;
    find_prompt(&mut elements);
    validate_prompt_count(&elements)?;
    tracing::debug!(count = elements.len(), "Parsed document elements");
    Ok(elements)
}

/// Ensure a list holds exactly one `Prompt` element.
pub(crate) fn validate_prompt_count(elements: &[Element]) -> AppResult<()> {
    match elements.iter().filter(|element| element.is_prompt()).count() {
        1 => Ok(()),
        0 => Err(AppError::Format(
            "Document has no prompt: add a <Prompt> tag or start with a line of text".to_string(),
        )),
        n => Err(AppError::Format(format!(
            "Document has {} prompts, expected exactly one",
            n
        ))),
    }
}

fn scan(input: &str) -> AppResult<Vec<Element>> {
    let mut elements = Vec::new();
    let mut state = ScanState::Outside;
    let mut cursor = 0;

    for captures in TAG.captures_iter(input) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        let closing = captures.get(1).is_some();
        let self_closing = captures.get(4).is_some();
        let name = captures.get(2).map_or("", |m| m.as_str());

        let Some(kind) = TagKind::from_name(name) else {
            return Err(format_error(input, whole.start(), format!("Unknown tag <{}>", name)));
        };
        if closing && self_closing {
            return Err(format_error(
                input,
                whole.start(),
                format!("Malformed tag {}", whole.as_str()),
            ));
        }

        state = match state {
            ScanState::Outside => {
                if closing {
                    return Err(format_error(
                        input,
                        whole.start(),
                        format!("Closing tag </{}> without an open tag", kind.name()),
                    ));
                }

                push_free_text(&mut elements, &input[cursor..whole.start()]);
                let tag = Tag {
                    kind,
                    attributes: parse_attributes(captures.get(3).map_or("", |m| m.as_str())),
                    start: whole.start(),
                };

                if self_closing {
                    elements.push(build_element(tag, ""));
                    ScanState::Outside
                } else {
                    ScanState::Open {
                        tag,
                        content_start: whole.end(),
                    }
                }
            }
            ScanState::Open { tag, content_start } => {
                if !closing {
                    return Err(format_error(
                        input,
                        whole.start(),
                        format!(
                            "Tag <{}> found while <{}> opened at {} is still open",
                            kind.name(),
                            tag.kind.name(),
                            position(input, tag.start)
                        ),
                    ));
                }
                if kind != tag.kind {
                    return Err(format_error(
                        input,
                        whole.start(),
                        format!(
                            "Closing tag </{}> does not match <{}> opened at {}",
                            kind.name(),
                            tag.kind.name(),
                            position(input, tag.start)
                        ),
                    ));
                }

                let content = strip_closing_newline(&input[content_start..whole.start()]);
                elements.push(build_element(tag, content));
                ScanState::Outside
            }
        };
        cursor = whole.end();
    }

    if let ScanState::Open { tag, .. } = state {
        return Err(format_error(
            input,
            tag.start,
            format!("Unclosed tag <{}>", tag.kind.name()),
        ));
    }

    let trailing = input[cursor..].trim();
    if !trailing.is_empty() {
        elements.push(Element::text(trailing));
    }

    Ok(elements)
}

fn push_free_text(elements: &mut Vec<Element>, text: &str) {
    if !text.is_empty() {
        elements.push(Element::text(text));
    }
}

fn parse_attributes(raw: &str) -> Vec<(String, String)> {
    ATTRIBUTE
        .captures_iter(raw)
        .filter_map(|captures| {
            let key = captures.get(1)?.as_str().to_string();
            let value = captures.get(2).or_else(|| captures.get(3))?.as_str().to_string();
            Some((key, value))
        })
        .collect()
}

fn build_element(tag: Tag, content: &str) -> Element {
    let element = match tag.kind {
        TagKind::Prompt => Element::prompt(content),
        TagKind::Text => Element::Text {
            id: tag.attribute("id").map(str::to_string),
            text: content.to_string(),
            is_generated: false,
        },
        TagKind::Resolve => Element::resolve(tag.attribute("prompt").map(str::to_string), content),
    };

    let known: &[&str] = match tag.kind {
        TagKind::Prompt => &[],
        TagKind::Text => &["id"],
        TagKind::Resolve => &["prompt"],
    };
    for (key, _) in &tag.attributes {
        if !known.iter().any(|k| k.eq_ignore_ascii_case(key)) {
            tracing::warn!(tag = tag.kind.name(), attribute = %key, "Ignoring unknown attribute");
        }
    }

    element
}

/// Remove exactly one newline sitting right before a closing tag.
fn strip_closing_newline(content: &str) -> &str {
    content
        .strip_suffix("\r\n")
        .or_else(|| content.strip_suffix('\n'))
        .unwrap_or(content)
}

fn position(input: &str, offset: usize) -> String {
    let prefix = &input[..offset];
    let line = prefix.matches('\n').count() + 1;
    let line_start = prefix.rfind('\n').map_or(0, |i| i + 1);
    let column = prefix[line_start..].chars().count() + 1;
    format!("line {}, column {}", line, column)
}

fn format_error(input: &str, offset: usize, message: String) -> AppError {
    AppError::Format(format!("{} at {}", message, position(input, offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tagged_document() {
        let input = "<Prompt>Summarize</Prompt>\n<Text Id=\"notes\">Line one\n</Text>\n<Resolve Prompt=\"Give a title\">Title: </Resolve>";
        let elements = parse_elements(input).unwrap();

        assert_eq!(elements.len(), 5);
        assert_eq!(elements[0], Element::prompt("Summarize"));
        assert_eq!(elements[1], Element::text("\n"));
        assert_eq!(
            elements[2],
            Element::Text {
                id: Some("notes".to_string()),
                text: "Line one".to_string(),
                is_generated: false,
            }
        );
        let resolve = elements[4].as_resolve().unwrap();
        assert_eq!(resolve.prompt.as_deref(), Some("Give a title"));
        assert_eq!(resolve.content, "Title: ");
        assert!(!resolve.is_resolved());
    }

    #[test]
    fn test_tag_names_are_case_insensitive() {
        let elements = parse_elements("<PROMPT>go</prompt><resolve prompt='x'/>").unwrap();
        assert_eq!(elements[0], Element::prompt("go"));
        assert_eq!(elements[1].as_resolve().unwrap().prompt.as_deref(), Some("x"));
    }

    #[test]
    fn test_resolve_prompt_attribute_is_optional() {
        let elements = parse_elements("<Prompt>p</Prompt><Resolve>Answer: </Resolve>").unwrap();
        let resolve = elements[1].as_resolve().unwrap();
        assert!(resolve.prompt.is_none());
        assert_eq!(resolve.content, "Answer: ");
    }

    #[test]
    fn test_trailing_text_is_trimmed() {
        let elements = parse_elements("<Prompt>p</Prompt>   tail  \n").unwrap();
        assert_eq!(elements.last(), Some(&Element::text("tail")));

        let elements = parse_elements("<Prompt>p</Prompt>  \n ").unwrap();
        assert_eq!(elements.len(), 1);
    }

    #[test]
    fn test_only_one_newline_stripped_before_close() {
        let elements = parse_elements("<Prompt>p</Prompt><Text>a\n\n</Text><Text>b\r\n</Text>").unwrap();
        assert_eq!(elements[1], Element::text("a\n"));
        assert_eq!(elements[2], Element::text("b"));
    }

    #[test]
    fn test_unknown_tag_is_error() {
        let err = parse_elements("<Prompt>p</Prompt><Query>x</Query>").unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
        assert!(err.to_string().contains("Unknown tag <Query>"));
    }

    #[test]
    fn test_unclosed_tag_names_tag_and_position() {
        let err = parse_elements("<Prompt>p</Prompt>\n<Resolve Prompt=\"x\">open").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Unclosed tag <Resolve>"));
        assert!(message.contains("line 2, column 1"));
    }

    #[test]
    fn test_error_column_counts_characters() {
        let err = parse_elements("<Prompt>héllo wörld</Prompt><Query/>").unwrap_err();
        assert!(err.to_string().contains("line 1, column 29"), "{err}");
    }

    #[test]
    fn test_tag_inside_open_tag_is_error() {
        let err = parse_elements("<Prompt>p<Resolve/></Prompt>").unwrap_err();
        assert!(err.to_string().contains("still open"));

        let err = parse_elements("<Prompt>p</Text>").unwrap_err();
        assert!(err.to_string().contains("does not match"));

        let err = parse_elements("text</Text>").unwrap_err();
        assert!(err.to_string().contains("without an open tag"));
    }

    #[test]
    fn test_prompt_cardinality() {
        let err = parse_elements("<Prompt>a</Prompt><Prompt>b</Prompt>").unwrap_err();
        assert!(err.to_string().contains("2 prompts"));

        let err = parse_elements("<Resolve Prompt=\"x\"/>").unwrap_err();
        assert!(err.to_string().contains("no prompt"));

        let err = parse_elements("").unwrap_err();
        assert!(matches!(err, AppError::Format(_)));
    }

    #[test]
    fn test_untagged_text_synthesizes_prompt() {
        let elements = parse_elements("List three colors\nOne per line").unwrap();
        assert_eq!(elements[0], Element::prompt("List three colors"));
        assert_eq!(elements[1], Element::text("One per line"));
    }

    #[test]
    fn test_leading_text_before_resolve_synthesizes_prompt() {
        let elements = parse_elements("Describe the sea\n<Resolve>Sea: </Resolve>").unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0], Element::prompt("Describe the sea"));
        assert!(elements[1].as_resolve().is_some());
    }
}
