use crate::extractors::extract_video_id;
use crate::output::{OutputKind, OutputWriter, Report, ResultPaths};
use crate::summarize::Summarizer;
use crate::transcript::{Transcript, TranscriptSource};
use crate::utils::{preview, spinner};
use crate::{Result, YoutextError};

use crate::config::API_KEY_ENV;

/// Runs one command: resolve the video, fetch its transcript, generate, write results
pub struct Pipeline {
    source: Box<dyn TranscriptSource>,
    summarizer: Option<Summarizer>,
    writer: OutputWriter,
    quiet: bool,
}

impl Pipeline {
    /// `summarizer` is `None` when no API credential is configured
    pub fn new(
        source: Box<dyn TranscriptSource>,
        summarizer: Option<Summarizer>,
        writer: OutputWriter,
        quiet: bool,
    ) -> Self {
        Self {
            source,
            summarizer,
            writer,
            quiet,
        }
    }

    /// `script`: fetch the transcript and write it
    pub async fn script(&self, input: &str) -> Result<Report> {
        tracing::info!("Processing YouTube input: {}", input);

        let transcript = self.fetch(input).await?;
        let text = transcript.text();

        let mut paths = ResultPaths::default();
        paths.set(
            OutputKind::Transcript,
            self.writer.write(&transcript.video_id, OutputKind::Transcript, &text)?,
        );

        Ok(Report {
            video_id: transcript.video_id,
            language: transcript.language,
            transcript_tokens: None,
            transcript: Some(text),
            generated: None,
            truncated: false,
            paths,
            generated_at: chrono::Utc::now(),
        })
    }

    /// `summ`: fetch, summarize, then write transcript and summary
    pub async fn summ(&self, input: &str) -> Result<Report> {
        tracing::info!("Processing YouTube input: {}", input);

        let summarizer = self.summarizer()?;
        let transcript = self.fetch(input).await?;
        let text = transcript.text();
        let transcript_tokens = summarizer.count_tokens(&text);
        tracing::info!("Fetched transcript with {} tokens", transcript_tokens);

        let progress = spinner("Summarizing transcript...", self.quiet);
        let summary = summarizer.summarize(&transcript).await;
        progress.finish_and_clear();
        let summary = summary?;

        tracing::debug!(
            "Summary took {} completion call(s): {}",
            summary.completion_calls,
            preview(&summary.text, 200)
        );

        let paths = self.writer.write_all(
            &transcript.video_id,
            &[
                (OutputKind::Transcript, text.as_str()),
                (OutputKind::Summary, summary.text.as_str()),
            ],
        )?;

        Ok(Report {
            video_id: transcript.video_id,
            language: transcript.language,
            transcript_tokens: Some(transcript_tokens),
            transcript: None,
            generated: Some(summary.text),
            truncated: summary.truncated,
            paths,
            generated_at: chrono::Utc::now(),
        })
    }

    /// `outline`: fetch, outline, then write the outline
    pub async fn outline(&self, input: &str) -> Result<Report> {
        tracing::info!("Processing YouTube input: {}", input);

        let summarizer = self.summarizer()?;
        let transcript = self.fetch(input).await?;
        let transcript_tokens = summarizer.count_tokens(&transcript.text());

        let progress = spinner("Generating outline...", self.quiet);
        let outline = summarizer.outline(&transcript).await;
        progress.finish_and_clear();
        let outline = outline?;

        let mut paths = ResultPaths::default();
        paths.set(
            OutputKind::Outline,
            self.writer.write(&transcript.video_id, OutputKind::Outline, &outline.text)?,
        );

        Ok(Report {
            video_id: transcript.video_id,
            language: transcript.language,
            transcript_tokens: Some(transcript_tokens),
            transcript: None,
            generated: Some(outline.text),
            truncated: outline.truncated,
            paths,
            generated_at: chrono::Utc::now(),
        })
    }

    fn summarizer(&self) -> Result<&Summarizer> {
        self.summarizer.as_ref().ok_or_else(|| {
            YoutextError::Summarization(format!(
                "{} is not set; export it or pass --api-key",
                API_KEY_ENV
            ))
        })
    }

    async fn fetch(&self, input: &str) -> Result<Transcript> {
        let video_id = extract_video_id(input)?;

        let progress = spinner(format!("Fetching transcript for {}...", video_id), self.quiet);
        let transcript = self.source.fetch(&video_id).await;
        progress.finish_and_clear();

        transcript
    }
}
