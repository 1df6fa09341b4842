//! List command handler.

use super::{print_json, read_input};
use clap::Args;
use quill_extract::{ListExtractor, ListItem};
use std::path::PathBuf;

/// Extract list items from text
#[derive(Args, Debug)]
pub struct ListCommand {
    /// Text file ("-" reads stdin)
    pub file: PathBuf,

    /// Only look for numbered items
    #[arg(long)]
    pub numbered: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ListCommand {
    pub fn execute(&self) -> anyhow::Result<()> {
        let text = read_input(&self.file)?;
        let items = if self.numbered {
            ListExtractor::extract_numbered(&text)
        } else {
            ListExtractor::extract(&text)
        };
        tracing::debug!("Extracted {} list items", items.len());

        if self.json {
            return print_json(&items);
        }

        for item in &items {
            match item {
                ListItem::Numbered { index, text } => println!("{}. {}", index, text),
                ListItem::Plain { text } => println!("- {}", text),
            }
        }
        Ok(())
    }
}
