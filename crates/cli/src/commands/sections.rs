//! Sections command handler.

use super::{print_json, read_input};
use clap::Args;
use quill_extract::Sections;
use std::path::PathBuf;

/// Split markdown text into heading sections
#[derive(Args, Debug)]
pub struct SectionsCommand {
    /// Text file ("-" reads stdin)
    pub file: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl SectionsCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        let text = read_input(&self.file)?;
        let sections = Sections::parse(&text);
        tracing::debug!("Found {} sections", sections.len());

        if self.json {
            let entries: Vec<serde_json::Value> = sections
                .iter()
                .map(|(name, body)| serde_json::json!({ "name": name, "body": body }))
                .collect();
            return print_json(&entries);
        }

        for (name, body) in sections.iter() {
            println!("## {}\n{}\n", name, body);
        }
        Ok(())
    }
}
