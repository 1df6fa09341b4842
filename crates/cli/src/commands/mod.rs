//! Command handlers for the quill CLI.

pub mod chain;
pub mod list;
pub mod resolve;
pub mod sections;
pub mod templates;

pub use chain::ChainCommand;
pub use list::ListCommand;
pub use resolve::ResolveCommand;
pub use sections::SectionsCommand;
pub use templates::TemplatesCommand;

use anyhow::Context;
use quill_core::AppConfig;
use quill_llm::{client_from_config, LlmClient, ScriptedClient};
use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Client for a command run. Dry runs echo locally instead of calling out.
pub(crate) fn build_client(config: &AppConfig, dry_run: bool) -> anyhow::Result<Arc<dyn LlmClient>> {
    if dry_run {
        tracing::info!("Dry run: using echo client");
        return Ok(Arc::new(ScriptedClient::echo()));
    }

    config.validate()?;
    Ok(client_from_config(config)?)
}

/// Read a file, or stdin when the path is `-`.
pub(crate) fn read_input(path: &Path) -> anyhow::Result<String> {
    if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read stdin")?;
        return Ok(buffer);
    }

    std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
