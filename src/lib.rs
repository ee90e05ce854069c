//! youtext - fetch YouTube transcripts and summarize them from the command line
//!
//! This library resolves a YouTube URL or video ID, retrieves the video's transcript,
//! optionally condenses it through an OpenAI-compatible completion API and writes the
//! results to files in the temporary directory.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod pipeline;
pub mod summarize;
pub mod transcript;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{extract_video_id, VideoId};
pub use output::{OutputWriter, Report, ResultPaths};
pub use pipeline::Pipeline;
pub use summarize::{CompletionClient, ContextPolicy, Summarizer, Summary};
pub use transcript::{Transcript, TranscriptSegment, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, YoutextError>;

/// Failure kinds surfaced to the command line
#[derive(thiserror::Error, Debug)]
pub enum YoutextError {
    #[error("Invalid YouTube URL or video ID: {0}")]
    InvalidReference(String),

    #[error("Transcript unavailable for video {video_id}: {reason}")]
    TranscriptUnavailable { video_id: String, reason: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Summarization failed: {0}")]
    Summarization(String),

    #[error("File operation failed: {0}")]
    Io(#[from] std::io::Error),
}

impl YoutextError {
    /// Process exit status for this failure kind
    pub fn exit_code(&self) -> i32 {
        match self {
            YoutextError::InvalidReference(_) => 3,
            YoutextError::TranscriptUnavailable { .. } => 4,
            YoutextError::Network(_) => 5,
            YoutextError::Summarization(_) => 6,
            YoutextError::Io(_) => 7,
        }
    }
}
