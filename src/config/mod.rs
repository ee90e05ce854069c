use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::summarize::ContextPolicy;

/// Environment variable holding the completion API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable pointing at an explicit config file
pub const CONFIG_ENV: &str = "YOUTEXT_CONFIG";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Completion API settings
    pub openai: OpenAiConfig,

    /// Transcript retrieval settings
    pub transcript: TranscriptConfig,

    /// Summarization settings
    pub summary: SummaryConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Model used for summaries and outlines
    pub model: String,

    /// Base URL of the OpenAI-compatible API
    pub api_base: String,

    /// Tokens reserved for each completion
    pub max_tokens: usize,

    /// Model context window in tokens (looked up from the model name if unset)
    pub context_window: Option<usize>,

    /// Sampling temperature (API default if unset)
    pub temperature: Option<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptConfig {
    /// Preferred transcript languages, in order
    pub languages: Vec<String>,

    /// Keep HTML formatting tags in transcript text
    pub preserve_formatting: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// How transcripts larger than the context window are handled
    pub context_policy: ContextPolicy,

    /// Upper bound on reduce rounds for the map-reduce policy
    pub max_rounds: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory for output files (system temp dir if unset)
    pub output_dir: Option<PathBuf>,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
            max_tokens: 4096,
            context_window: None,
            temperature: None,
        }
    }
}

impl Default for TranscriptConfig {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            preserve_formatting: false,
        }
    }
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            context_policy: ContextPolicy::Truncate,
            max_rounds: 4,
        }
    }
}

impl Config {
    /// Load configuration from `explicit`, or the first default location that exists.
    ///
    /// An explicit path must exist; default locations fall back to built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        match Self::existing_default_path() {
            Some(path) => Self::load_from(&path),
            None => {
                tracing::debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load and validate configuration from a YAML file
    pub fn load_from(path: &Path) -> Result<Self> {
        tracing::debug!("Loading config from {}", path.display());

        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to `path`, creating parent directories
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Per-user configuration file path
    pub fn user_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("youtext").join("config.yaml"))
    }

    fn existing_default_path() -> Option<PathBuf> {
        // Current directory first for easy testing
        let local_config = PathBuf::from("youtext.yaml");
        if local_config.exists() {
            return Some(local_config);
        }

        Self::user_config_path().ok().filter(|path| path.exists())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.openai.model.trim().is_empty() {
            anyhow::bail!("openai.model must not be empty");
        }

        if self.openai.max_tokens == 0 {
            anyhow::bail!("openai.max_tokens must be greater than zero");
        }

        let window = self.context_window();
        if window <= self.openai.max_tokens {
            match self.openai.context_window {
                Some(_) => anyhow::bail!(
                    "openai.context_window ({}) must be larger than openai.max_tokens ({})",
                    window,
                    self.openai.max_tokens
                ),
                None => anyhow::bail!(
                    "Context window of model {} defaults to {} tokens, which leaves no room \
                     next to openai.max_tokens ({}); set openai.context_window",
                    self.openai.model,
                    window,
                    self.openai.max_tokens
                ),
            }
        }

        let api_base = url::Url::parse(&self.openai.api_base)
            .with_context(|| format!("Invalid openai.api_base: {}", self.openai.api_base))?;
        if !matches!(api_base.scheme(), "http" | "https") {
            anyhow::bail!("openai.api_base must use HTTP or HTTPS protocol");
        }

        if self.transcript.languages.is_empty() {
            anyhow::bail!("transcript.languages must list at least one language code");
        }

        if self.summary.max_rounds == 0 {
            anyhow::bail!("summary.max_rounds must be greater than zero");
        }

        Ok(())
    }

    /// Directory output files are written to
    pub fn output_dir(&self) -> PathBuf {
        self.app.output_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Context window of the configured model
    pub fn context_window(&self) -> usize {
        self.openai
            .context_window
            .unwrap_or_else(|| tiktoken_rs::model::get_context_size(&self.openai.model))
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Model: {}", self.openai.model);
        println!("  API Base: {}", self.openai.api_base);
        println!("  Max Completion Tokens: {}", self.openai.max_tokens);
        println!("  Context Window: {}", self.context_window());
        println!("  Transcript Languages: {}", self.transcript.languages.join(", "));
        println!("  Context Policy: {}", self.summary.context_policy);
        println!("  Output Directory: {}", self.output_dir().display());
    }
}
