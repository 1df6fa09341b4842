//! Prompt synthesis for documents written without a `<Prompt>` tag.

use crate::element::Element;

/// Promote the first non-blank line of a leading `Text` element to the
/// document prompt.
///
/// Does nothing when the list is empty, already holds a `Prompt`, or does
/// not start with `Text`. Lines after the promoted one stay in the `Text`
/// element, which is removed if only whitespace remains. Returns whether a
/// prompt was synthesized.
pub fn find_prompt(elements: &mut Vec<Element>) -> bool {
    if elements.is_empty() || elements.iter().any(Element::is_prompt) {
        return false;
    }

    let Some(Element::Text { text, .. }) = elements.first_mut() else {
        return false;
    };

    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();
    let Some(position) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return false;
    };

    let prompt = lines[position].to_string();
    let remainder = lines[position + 1..].join("\n");
    let remainder_blank = remainder.trim().is_empty();
    *text = remainder;

    if remainder_blank {
        elements.remove(0);
    }
    elements.insert(0, Element::prompt(prompt));

    tracing::debug!("Synthesized prompt from leading text");
    true
}
