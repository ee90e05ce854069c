use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::{API_KEY_ENV, CONFIG_ENV};
use crate::summarize::ContextPolicy;

#[derive(Parser, Debug)]
#[command(
    name = "youtext",
    about = "YouTube video transcript and summary tool",
    version,
    long_about = "Fetch the transcript of a YouTube video and optionally summarize or outline it with an OpenAI-compatible model. Results are written to files in the temporary directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators and print only the saved paths
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// How to print the result
    #[arg(short, long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Configuration file
    #[arg(long, value_name = "FILE", env = CONFIG_ENV, global = true)]
    pub config: Option<PathBuf>,

    /// Directory for output files (defaults to the system temp directory)
    #[arg(long, value_name = "DIR", global = true)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize YouTube video
    Summ {
        #[command(flatten)]
        video: VideoArgs,

        #[command(flatten)]
        model: ModelArgs,

        /// How to handle transcripts longer than the context window
        #[arg(long, value_enum)]
        policy: Option<ContextPolicy>,
    },

    /// Fetch transcript of YouTube video
    Script {
        #[command(flatten)]
        video: VideoArgs,
    },

    /// Generate outline of YouTube video content
    Outline {
        #[command(flatten)]
        video: VideoArgs,

        #[command(flatten)]
        model: ModelArgs,
    },

    /// Show the effective configuration or write a default config file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

#[derive(Args, Debug)]
pub struct VideoArgs {
    /// YouTube video URL or ID
    #[arg(value_name = "URL_OR_ID")]
    pub input: String,

    /// Preferred transcript language (repeatable, in order of preference)
    #[arg(short, long = "lang", value_name = "LANG")]
    pub languages: Vec<String>,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Completion API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model used for generation (overrides the config file)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON result record
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
