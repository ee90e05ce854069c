use async_trait::async_trait;
use serde::Serialize;

use crate::extractors::VideoId;
use crate::utils::format_duration;
use crate::{Result, YoutextError};

pub mod youtube;

pub use youtube::YoutubeTranscriptSource;

/// Transcript of one video as returned by the transcript service
#[derive(Debug, Clone, Serialize)]
pub struct Transcript {
    /// Video the transcript belongs to
    pub video_id: VideoId,

    /// Language code of the fetched track
    pub language: String,

    /// Whether the track was generated by automatic speech recognition
    pub is_generated: bool,

    /// Segments in playback order
    pub segments: Vec<TranscriptSegment>,
}

/// Individual transcript segment with timing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start time in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

impl Transcript {
    /// Full transcript text, segments joined by a single space
    pub fn text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// One line per segment prefixed with its start time, e.g. `[1m 30s] hello`
    pub fn timestamped_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| format!("[{}] {}", format_duration(segment.start), segment.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Source of video transcripts
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for `video_id` in a single attempt
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript>;
}

/// Markers in transcript library errors that indicate the service could not be reached
const NETWORK_MARKERS: &[&str] = &[
    "request to youtube failed",
    "error sending request",
    "error trying to connect",
    "connection",
    "timed out",
    "timeout",
    "dns error",
    "failed to lookup address",
    "network",
];

/// Map a transcript library failure message onto the error taxonomy
pub fn classify_failure(video_id: &VideoId, message: &str) -> YoutextError {
    let lower = message.to_lowercase();

    if NETWORK_MARKERS.iter().any(|marker| lower.contains(marker)) {
        YoutextError::Network(message.to_string())
    } else {
        YoutextError::TranscriptUnavailable {
            video_id: video_id.to_string(),
            reason: message.to_string(),
        }
    }
}
