//! YAML prompt templates rendered with Handlebars into documents.
//!
//! Templates live in `<prompts_dir>/<id>.yml`:
//!
//! ```yaml
//! id: story.outline
//! title: Story outline
//! defaults:
//!   tone: whimsical
//! template: |
//!   <Prompt>Outline a {{tone}} story about {{subject}}.</Prompt>
//!   <Resolve Prompt="Name the hero.">Hero: </Resolve>
//! ```

use crate::document::Document;
use handlebars::Handlebars;
use quill_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// A prompt template loaded from YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptTemplate {
    /// Unique template identifier
    pub id: String,

    /// Human-readable title
    #[serde(default)]
    pub title: String,

    /// Handlebars source producing tag-annotated document text
    pub template: String,

    /// Variable values used when the caller supplies none
    #[serde(default)]
    pub defaults: BTreeMap<String, String>,
}

/// Load a template by ID from `prompts_dir`.
///
/// # Example
/// ```no_run
/// use quill_prompt::load_template;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let template = load_template(Path::new(".quill/prompts"), "story.outline")?;
/// println!("Loaded template: {}", template.title);
/// # Ok(())
/// # }
/// ```
pub fn load_template(prompts_dir: &Path, id: &str) -> AppResult<PromptTemplate> {
    let template_file = prompts_dir.join(format!("{}.yml", id));

    tracing::debug!("Loading template from: {:?}", template_file);

    if !template_file.exists() {
        return Err(AppError::Template(format!(
            "Template file not found: {:?}",
            template_file
        )));
    }

    let contents = std::fs::read_to_string(&template_file).map_err(|e| {
        AppError::Template(format!(
            "Failed to read template file {:?}: {}",
            template_file, e
        ))
    })?;

    let template: PromptTemplate = serde_yaml::from_str(&contents).map_err(|e| {
        AppError::Template(format!(
            "Failed to parse template YAML {:?}: {}",
            template_file, e
        ))
    })?;

    validate_template(&template)?;

    tracing::info!("Loaded template: {} ({})", template.id, template.title);

    Ok(template)
}

/// List template IDs available in `prompts_dir`, sorted.
pub fn list_templates(prompts_dir: &Path) -> AppResult<Vec<String>> {
    if !prompts_dir.exists() {
        return Ok(Vec::new());
    }

    let mut ids: Vec<String> = walkdir::WalkDir::new(prompts_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|s| s.to_str()) == Some("yml")
        })
        .filter_map(|entry| {
            entry
                .path()
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect();
    ids.sort();

    Ok(ids)
}

fn validate_template(template: &PromptTemplate) -> AppResult<()> {
    if template.id.trim().is_empty() {
        return Err(AppError::Template("Template ID cannot be empty".to_string()));
    }

    if template.template.trim().is_empty() {
        return Err(AppError::Template(format!(
            "Template '{}' has an empty template body",
            template.id
        )));
    }

    Ok(())
}

/// Merge variable layers: globals, then template defaults, then call
/// variables. Later layers win.
pub fn overlay(
    globals: &HashMap<String, String>,
    defaults: &BTreeMap<String, String>,
    variables: &HashMap<String, String>,
) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for (key, value) in globals.iter().chain(defaults).chain(variables) {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// Render a template's Handlebars source.
pub fn render_template(
    template: &PromptTemplate,
    globals: &HashMap<String, String>,
    variables: &HashMap<String, String>,
) -> AppResult<String> {
    let context = overlay(globals, &template.defaults, variables);

    let mut handlebars = Handlebars::new();
    // Prompt text is not HTML
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(&template.template, &context)
        .map_err(|e| {
            AppError::Template(format!(
                "Failed to render template '{}': {}",
                template.id, e
            ))
        })
}

/// Render a template and parse the result into a document.
pub fn render_document(
    template: &PromptTemplate,
    globals: &HashMap<String, String>,
    variables: &HashMap<String, String>,
) -> AppResult<Document> {
    let rendered = render_template(template, globals, variables)?;
    tracing::debug!(template = %template.id, chars = rendered.len(), "Rendered template");
    Document::parse(&rendered)
}
