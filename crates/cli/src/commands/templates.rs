//! Templates command handler.

use super::print_json;
use clap::Args;
use quill_core::AppConfig;
use quill_prompt::{list_templates, load_template};

/// List prompt templates in the workspace
#[derive(Args, Debug)]
pub struct TemplatesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl TemplatesCommand {
    pub fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let prompts_dir = config.prompts_dir();
        let ids = list_templates(&prompts_dir)?;

        if ids.is_empty() {
            tracing::warn!("No templates found in {}", prompts_dir.display());
        }

        if self.json {
            return print_json(&ids);
        }

        for id in &ids {
            match load_template(&prompts_dir, id) {
                Ok(template) if !template.title.is_empty() => println!("{}  {}", id, template.title),
                Ok(_) => println!("{}", id),
                Err(e) => println!("{}  (invalid: {})", id, e),
            }
        }
        Ok(())
    }
}
