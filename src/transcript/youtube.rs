use async_trait::async_trait;
use yt_transcript_rs::YouTubeTranscriptApi;

use super::{classify_failure, Transcript, TranscriptSegment, TranscriptSource};
use crate::config::TranscriptConfig;
use crate::extractors::VideoId;
use crate::{Result, YoutextError};

/// Transcript source backed by the `yt-transcript-rs` client
pub struct YoutubeTranscriptSource {
    api: YouTubeTranscriptApi,
    languages: Vec<String>,
    preserve_formatting: bool,
}

impl YoutubeTranscriptSource {
    pub fn new(config: &TranscriptConfig) -> Result<Self> {
        let api = YouTubeTranscriptApi::new(None, None, None).map_err(|e| {
            YoutextError::Network(format!("Failed to initialize transcript client: {}", e))
        })?;

        Ok(Self {
            api,
            languages: config.languages.clone(),
            preserve_formatting: config.preserve_formatting,
        })
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptSource {
    async fn fetch(&self, video_id: &VideoId) -> Result<Transcript> {
        tracing::info!("Fetching transcript for video ID: {}", video_id);

        let languages: Vec<&str> = self.languages.iter().map(String::as_str).collect();

        let fetched = self
            .api
            .fetch_transcript(video_id.as_str(), &languages, self.preserve_formatting)
            .await
            .map_err(|e| {
                tracing::error!("Error fetching transcript: {}", e);
                classify_failure(video_id, &e.to_string())
            })?;

        let segments: Vec<TranscriptSegment> = fetched
            .parts()
            .iter()
            .map(|part| TranscriptSegment {
                text: part.text.clone(),
                start: part.start,
                duration: part.duration,
            })
            .collect();

        if segments.iter().all(|segment| segment.text.trim().is_empty()) {
            return Err(YoutextError::TranscriptUnavailable {
                video_id: video_id.to_string(),
                reason: "the transcript is empty".to_string(),
            });
        }

        tracing::debug!(
            "Fetched {} segments ({}, generated: {})",
            segments.len(),
            fetched.language_code,
            fetched.is_generated
        );

        Ok(Transcript {
            video_id: video_id.clone(),
            language: fetched.language_code.clone(),
            is_generated: fetched.is_generated,
            segments,
        })
    }
}
