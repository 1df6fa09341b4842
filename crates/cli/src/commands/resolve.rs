//! Resolve command handler.

use super::{build_client, print_json, read_input};
use anyhow::Context;
use clap::Args;
use quill_core::AppConfig;
use quill_prompt::{load_template, render_document, Document, ResolveOptions};
use std::collections::HashMap;
use std::path::PathBuf;

/// Resolve a prompt document or template
#[derive(Args, Debug)]
pub struct ResolveCommand {
    /// Document file ("-" reads stdin)
    #[arg(required_unless_present = "template")]
    pub file: Option<PathBuf>,

    /// Render a workspace template instead of reading a file
    #[arg(short, long, conflicts_with = "file")]
    pub template: Option<String>,

    /// Template variable, repeatable
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var)]
    pub vars: Vec<(String, String)>,

    /// Stop after the first resolved element
    #[arg(long)]
    pub halt_first: bool,

    /// Send the resolved document for a final completion
    #[arg(long)]
    pub submit: bool,

    /// Send a raw prompt instead of a chat message
    #[arg(long)]
    pub raw: bool,

    /// Echo locally instead of calling the provider
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum tokens per call
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0-2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

impl ResolveCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing resolve command");
        tracing::debug!("Resolve command options: {:?}", self);

        let mut document = self.load_document(config)?;
        let client = build_client(config, self.dry_run)?;

        let mut options = ResolveOptions::new(config.model.clone())
            .halt_after_first_complete(self.halt_first)
            .submit_result_for_completion(self.submit)
            .as_chat(!self.raw);
        if let Some(max_tokens) = self.max_tokens {
            options = options.with_max_tokens(max_tokens);
        }
        if let Some(temperature) = self.temperature {
            options = options.with_temperature(temperature);
        }

        let outcome = document.resolve(client.as_ref(), &options).await;

        if self.json {
            print_json(&serde_json::json!({
                "provider": client.provider_name(),
                "model": config.model,
                "rendered": document.to_string(),
                "generated": document.generated_text(),
                "document": document,
                "outcome": outcome,
            }))?;
        } else {
            println!("{}", document);
        }

        if let Some(failure) = outcome.failure_detail() {
            anyhow::bail!("Resolution failed: {}", failure);
        }

        let usage = outcome.usage();
        tracing::info!(
            "Resolution complete ({} prompt, {} completion tokens in last call)",
            usage.prompt_tokens,
            usage.completion_tokens
        );
        Ok(())
    }

    fn load_document(&self, config: &AppConfig) -> anyhow::Result<Document> {
        if let Some(ref id) = self.template {
            let template = load_template(&config.prompts_dir(), id)?;
            let globals = HashMap::from([
                ("provider".to_string(), config.provider.clone()),
                ("model".to_string(), config.model.clone()),
            ]);
            let vars: HashMap<String, String> = self.vars.iter().cloned().collect();
            return render_document(&template, &globals, &vars)
                .with_context(|| format!("Failed to build document from template '{}'", id));
        }

        let path = self
            .file
            .as_deref()
            .context("No document file or template provided")?;
        let text = read_input(path)?;
        Document::parse(&text).with_context(|| format!("Invalid document {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_var() {
        assert_eq!(
            parse_var("subject=an owl").unwrap(),
            ("subject".to_string(), "an owl".to_string())
        );
        assert_eq!(parse_var("eq=a=b").unwrap().1, "a=b");
        assert!(parse_var("novalue").is_err());
        assert!(parse_var("=x").is_err());
    }
}
