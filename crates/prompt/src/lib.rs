//! Prompt documents for quill.
//!
//! This crate provides:
//! - A tag-annotated document format (`<Prompt>`, `<Text>`, `<Resolve>`)
//! - Recursive resolution of `Resolve` elements against an LLM client
//! - YAML prompt templates rendered with Handlebars into documents

pub mod document;
pub mod element;
pub mod parser;
pub mod prompt_finder;
pub mod resolver;
pub mod template;

// Re-export main types
pub use document::Document;
pub use element::{Element, ResolveElement};
pub use parser::parse_elements;
pub use prompt_finder::find_prompt;
pub use resolver::ResolveOptions;
pub use template::{
    list_templates, load_template, overlay, render_document, render_template, PromptTemplate,
};
