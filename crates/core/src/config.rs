//! Configuration management for quill.
//!
//! Sources, lowest precedence first:
//! - Built-in defaults
//! - `<workspace>/.quill/config.yaml` (or the file named by `QUILL_CONFIG`)
//! - Environment variables
//! - Command-line flags (`with_overrides`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Providers the client factory knows how to build.
pub const KNOWN_PROVIDERS: [&str; 3] = ["openai", "ollama", "echo"];

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .quill/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// LLM provider ("openai", "ollama", "echo")
    pub provider: String,

    /// Default model identifier passed through to the provider
    pub model: String,

    /// Custom API base URL
    pub endpoint: Option<String>,

    /// Explicit API key
    pub api_key: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// Attempts after the first failed call
    pub max_retries: u32,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    workspace: Option<WorkspaceSection>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
    max_retries: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkspaceSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            endpoint: None,
            api_key: None,
            api_key_env: None,
            max_retries: 3,
            timeout_secs: 60,
            log_level: None,
            verbose: false,
            no_color: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML config file and the environment.
    ///
    /// Environment variables:
    /// - `QUILL_WORKSPACE`: Override workspace path
    /// - `QUILL_CONFIG`: Path to config file
    /// - `QUILL_PROVIDER`, `QUILL_MODEL`, `QUILL_ENDPOINT`, `QUILL_API_KEY`
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use quill_core::config::AppConfig;
    ///
    /// let config = AppConfig::load().expect("Failed to load config");
    /// println!("Model: {}", config.model);
    /// ```
    pub fn load() -> AppResult<Self> {
        Self::load_from(None, None)
    }

    /// Like [`AppConfig::load`], with workspace and config file paths from
    /// the command line taking precedence over `QUILL_WORKSPACE` and
    /// `QUILL_CONFIG`. The YAML read is the one these paths point at.
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        let workspace =
            workspace.or_else(|| std::env::var_os("QUILL_WORKSPACE").map(PathBuf::from));
        if let Some(workspace) = workspace {
            config.workspace = workspace;
        }

        config.config_file =
            config_file.or_else(|| std::env::var_os("QUILL_CONFIG").map(PathBuf::from));

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.quill_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        if let Ok(provider) = std::env::var("QUILL_PROVIDER") {
            config.provider = provider;
        }
        if let Ok(model) = std::env::var("QUILL_MODEL") {
            config.model = model;
        }
        if let Ok(endpoint) = std::env::var("QUILL_ENDPOINT") {
            config.endpoint = Some(endpoint);
        }
        if let Ok(key) = std::env::var("QUILL_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }
        if std::env::var("NO_COLOR").is_ok() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        let mut result = self.clone();

        if let Some(path) = file.workspace.and_then(|ws| ws.path) {
            result.workspace = PathBuf::from(path);
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            result.endpoint = llm.endpoint.or(result.endpoint);
            result.api_key_env = llm.api_key_env.or(result.api_key_env);
            if let Some(retries) = llm.max_retries {
                result.max_retries = retries;
            }
            if let Some(timeout) = llm.timeout_secs {
                result.timeout_secs = timeout;
            }
        }

        Ok(result)
    }

    /// Apply CLI overrides to the configuration.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }
        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }
        if let Some(provider) = provider {
            self.provider = provider;
        }
        if let Some(model) = model {
            self.model = model;
        }
        if let Some(log_level) = log_level {
            self.log_level = Some(log_level);
        }
        if verbose {
            self.verbose = true;
            if self.log_level.is_none() {
                self.log_level = Some("debug".to_string());
            }
        }
        if no_color {
            self.no_color = true;
        }
        self
    }

    /// Path to the .quill directory.
    pub fn quill_dir(&self) -> PathBuf {
        self.workspace.join(".quill")
    }

    /// Directory holding YAML prompt templates.
    pub fn prompts_dir(&self) -> PathBuf {
        self.quill_dir().join("prompts")
    }

    /// Resolve the API key: explicit key, configured env var, then `OPENAI_API_KEY`.
    pub fn resolve_api_key(&self) -> Option<String> {
        if let Some(ref key) = self.api_key {
            return Some(key.clone());
        }

        if let Some(ref env_var) = self.api_key_env {
            if let Ok(key) = std::env::var(env_var) {
                return Some(key);
            }
        }

        std::env::var("OPENAI_API_KEY").ok()
    }

    /// Whether the active provider needs an API key.
    pub fn requires_api_key(&self) -> bool {
        self.provider.eq_ignore_ascii_case("openai")
    }

    /// Validate configuration for the active provider.
    pub fn validate(&self) -> AppResult<()> {
        let provider = self.provider.to_lowercase();

        if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.requires_api_key() && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "Provider '{}' requires an API key (set QUILL_API_KEY or {})",
                self.provider,
                self.api_key_env.as_deref().unwrap_or("OPENAI_API_KEY")
            )));
        }

        if self.timeout_secs == 0 {
            return Err(AppError::Config("timeoutSecs must be positive".to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.provider, "openai");
        assert_eq!(config.max_retries, 3);
        assert!(!config.verbose);
        assert!(config.prompts_dir().ends_with(".quill/prompts"));
    }

    #[test]
    fn test_with_overrides() {
        let config = AppConfig::default().with_overrides(
            None,
            None,
            Some("ollama".to_string()),
            Some("llama3.2".to_string()),
            None,
            true,
            false,
        );

        assert_eq!(config.provider, "ollama");
        assert_eq!(config.model, "llama3.2");
        assert_eq!(config.log_level, Some("debug".to_string()));
    }

    #[test]
    fn test_merge_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            r#"
llm:
  provider: ollama
  model: llama3.2
  endpoint: http://localhost:11434/v1
  maxRetries: 1
logging:
  level: warn
  color: false
"#,
        )
        .unwrap();

        let merged = AppConfig::default().merge_yaml(&path).unwrap();
        assert_eq!(merged.provider, "ollama");
        assert_eq!(merged.model, "llama3.2");
        assert_eq!(merged.endpoint.as_deref(), Some("http://localhost:11434/v1"));
        assert_eq!(merged.max_retries, 1);
        assert_eq!(merged.timeout_secs, 60);
        assert_eq!(merged.log_level.as_deref(), Some("warn"));
        assert!(merged.no_color);
    }

    #[test]
    fn test_merge_invalid_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "llm: [unterminated").unwrap();

        let err = AppConfig::default().merge_yaml(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_load_from_reads_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("other.yaml");
        std::fs::write(&path, "llm:\n  maxRetries: 7\n  timeoutSecs: 15\n").unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), Some(path.clone())).unwrap();
        assert_eq!(config.max_retries, 7);
        assert_eq!(config.timeout_secs, 15);
        assert_eq!(config.config_file.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_load_from_reads_workspace_config() {
        let dir = TempDir::new().unwrap();
        let quill_dir = dir.path().join(".quill");
        std::fs::create_dir_all(&quill_dir).unwrap();
        std::fs::write(quill_dir.join("config.yaml"), "llm:\n  timeoutSecs: 42\n").unwrap();

        let config = AppConfig::load_from(Some(dir.path().to_path_buf()), None);
        // An explicit QUILL_CONFIG in the environment would point elsewhere.
        if std::env::var_os("QUILL_CONFIG").is_none() {
            assert_eq!(config.unwrap().timeout_secs, 42);
        }
    }

    #[test]
    fn test_load_from_missing_workspace_errors() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = AppConfig::load_from(Some(missing), None).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_validate_unknown_provider() {
        let config = AppConfig {
            provider: "carrier-pigeon".to_string(),
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_keyless_providers() {
        for provider in ["ollama", "echo"] {
            let config = AppConfig {
                provider: provider.to_string(),
                ..AppConfig::default()
            };
            assert!(config.validate().is_ok(), "{provider} should validate");
        }
    }

    #[test]
    fn test_explicit_api_key_wins() {
        let config = AppConfig {
            api_key: Some("sk-test".to_string()),
            ..AppConfig::default()
        };
        assert_eq!(config.resolve_api_key().as_deref(), Some("sk-test"));
        assert!(config.validate().is_ok());
    }
}
