//! Chain command handler.

use super::{build_client, print_json, read_input};
use anyhow::Context;
use clap::Args;
use quill_core::AppConfig;
use quill_llm::{Chain, ChainOptions};
use std::path::PathBuf;

/// Run a dialog chain described in YAML
#[derive(Args, Debug)]
pub struct ChainCommand {
    /// YAML list of chain steps ("-" reads stdin)
    pub file: PathBuf,

    /// Echo locally instead of calling the provider
    #[arg(long)]
    pub dry_run: bool,

    /// Maximum tokens per send
    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl ChainCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing chain command");

        let text = read_input(&self.file)?;
        let chain: Chain = serde_yaml::from_str(&text)
            .with_context(|| format!("Invalid chain file {}", self.file.display()))?;
        tracing::debug!("Loaded chain with {} steps", chain.steps().len());

        let client = build_client(config, self.dry_run)?;
        let mut options = ChainOptions::new(config.model.clone());
        options.max_tokens = self.max_tokens;

        let result = chain.run(client.as_ref(), &options).await;

        if self.json {
            print_json(&result)?;
        } else {
            for message in &result.messages {
                println!("[{}] {}", message.role.as_str(), message.content);
            }
        }

        if let Some(failure) = result.outcome.failure_detail() {
            anyhow::bail!("Chain stopped after {} sends: {}", result.sends, failure);
        }
        Ok(())
    }
}
