use async_trait::async_trait;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::Config;
use crate::extractors::VideoId;
use crate::transcript::Transcript;
use crate::{Result, YoutextError};

pub mod openai;
pub mod tokens;

pub use openai::OpenAiClient;
pub use tokens::TokenCounter;

const SUMMARY_SYSTEM: &str = "You are a helpful assistant that summarizes text.";
const SUMMARY_PREFIX: &str = "Please summarize the following text:\n\n";

const OUTLINE_SYSTEM: &str = "Create a comprehensive outline that can serve as a standalone reference. Include:
- Main topics with timestamps (if available)
- Key points and arguments
- Important examples and evidence
- Notable quotes or statements
- Definitions of technical terms
- Conclusions and takeaways

The outline should be detailed enough that someone wouldn't need to watch the video or read the transcript to understand the content fully.";
const OUTLINE_PREFIX: &str = "Please create a detailed outline for this transcript:\n\n";

/// Chat completion backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one system + user prompt pair and return the generated text
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

/// Handling of transcripts that do not fit the model's context window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ContextPolicy {
    /// Keep the earliest tokens that fit, single completion call
    Truncate,
    /// Summarize fitting chunks, then summarize the joined partial summaries
    MapReduce,
}

impl fmt::Display for ContextPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextPolicy::Truncate => write!(f, "truncate"),
            ContextPolicy::MapReduce => write!(f, "map-reduce"),
        }
    }
}

/// Text generated from a transcript (summary or outline)
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub video_id: VideoId,

    pub text: String,

    /// Number of completion calls it took
    pub completion_calls: usize,

    /// Whether part of the transcript was dropped to fit the context window
    pub truncated: bool,
}

struct Prompt {
    user: String,
    truncated: bool,
}

/// Turns transcripts into summaries and outlines through a [`CompletionClient`]
pub struct Summarizer {
    client: Box<dyn CompletionClient>,
    counter: TokenCounter,
    prompt_limit: usize,
    policy: ContextPolicy,
    max_rounds: usize,
}

impl Summarizer {
    /// `prompt_limit` bounds system + user prompt tokens of every call
    pub fn new(
        client: Box<dyn CompletionClient>,
        counter: TokenCounter,
        prompt_limit: usize,
        policy: ContextPolicy,
        max_rounds: usize,
    ) -> Self {
        Self {
            client,
            counter,
            prompt_limit,
            policy,
            max_rounds: max_rounds.max(1),
        }
    }

    /// Build a summarizer whose prompt limit is the context window minus the completion budget
    pub fn from_config(config: &Config, client: Box<dyn CompletionClient>) -> Result<Self> {
        let counter = TokenCounter::for_model(&config.openai.model)?;
        let prompt_limit = config.context_window().saturating_sub(config.openai.max_tokens);

        Ok(Self::new(
            client,
            counter,
            prompt_limit,
            config.summary.context_policy,
            config.summary.max_rounds,
        ))
    }

    /// Estimated token count of `text`
    pub fn count_tokens(&self, text: &str) -> usize {
        self.counter.count(text)
    }

    /// Summarize a transcript according to the configured [`ContextPolicy`]
    pub async fn summarize(&self, transcript: &Transcript) -> Result<Summary> {
        let text = transcript.text();
        tracing::info!("Summarizing text of {} tokens", self.counter.count(&text));

        match self.policy {
            ContextPolicy::Truncate => {
                let prompt = self.build_prompt(SUMMARY_SYSTEM, SUMMARY_PREFIX, &text)?;
                let summary = self.client.complete(SUMMARY_SYSTEM, &prompt.user).await?;

                Ok(Summary {
                    video_id: transcript.video_id.clone(),
                    text: summary,
                    completion_calls: 1,
                    truncated: prompt.truncated,
                })
            }
            ContextPolicy::MapReduce => self.map_reduce(transcript, text).await,
        }
    }

    /// Produce a detailed outline from the timestamped transcript
    pub async fn outline(&self, transcript: &Transcript) -> Result<Summary> {
        tracing::info!("Generating detailed outline from transcript");

        let text = transcript.timestamped_text();
        let prompt = self.build_prompt(OUTLINE_SYSTEM, OUTLINE_PREFIX, &text)?;
        let outline = self.client.complete(OUTLINE_SYSTEM, &prompt.user).await?;

        Ok(Summary {
            video_id: transcript.video_id.clone(),
            text: outline,
            completion_calls: 1,
            truncated: prompt.truncated,
        })
    }

    async fn map_reduce(&self, transcript: &Transcript, mut text: String) -> Result<Summary> {
        let chunk_tokens = self.available_tokens(SUMMARY_SYSTEM, SUMMARY_PREFIX)?;
        let mut calls = 0;
        let mut truncated = false;

        for round in 1..=self.max_rounds {
            let chunks = self.counter.split(&text, chunk_tokens)?;
            tracing::info!("Round {}: summarizing {} chunk(s)", round, chunks.len());

            let mut partials = Vec::with_capacity(chunks.len());
            for (i, chunk) in chunks.iter().enumerate() {
                tracing::info!(
                    "Processing chunk {}/{} ({} tokens)",
                    i + 1,
                    chunks.len(),
                    self.counter.count(chunk)
                );
                let prompt = self.build_prompt(SUMMARY_SYSTEM, SUMMARY_PREFIX, chunk)?;
                partials.push(self.client.complete(SUMMARY_SYSTEM, &prompt.user).await?);
                truncated |= prompt.truncated;
                calls += 1;
            }

            if partials.len() <= 1 {
                return Ok(Summary {
                    video_id: transcript.video_id.clone(),
                    text: partials.pop().unwrap_or_default(),
                    completion_calls: calls,
                    truncated,
                });
            }

            text = partials.join(" ");
        }

        Err(YoutextError::Summarization(format!(
            "Summary still spans several chunks after {} rounds",
            self.max_rounds
        )))
    }

    /// Tokens left for transcript text once the fixed prompt parts are counted
    fn available_tokens(&self, system: &str, prefix: &str) -> Result<usize> {
        let overhead = self.counter.count(system) + self.counter.count(prefix);

        self.prompt_limit
            .checked_sub(overhead)
            .filter(|available| *available > 0)
            .ok_or_else(|| {
                YoutextError::Summarization(format!(
                    "Context window leaves {} prompt tokens, the instructions alone need {}",
                    self.prompt_limit, overhead
                ))
            })
    }

    /// User prompt for `text`, head-truncated so system + user fit the prompt limit
    fn build_prompt(&self, system: &str, prefix: &str, text: &str) -> Result<Prompt> {
        let fixed = self.counter.count(system);
        let user = format!("{}{}", prefix, text);
        if fixed + self.counter.count(&user) <= self.prompt_limit {
            return Ok(Prompt { user, truncated: false });
        }

        let mut available = self.available_tokens(system, prefix)?;
        loop {
            let kept = self.counter.truncate(text, available)?;
            let user = format!("{}{}", prefix, kept);
            let total = fixed + self.counter.count(&user);

            if total <= self.prompt_limit {
                tracing::warn!(
                    "Transcript truncated to {} tokens to fit the context window",
                    self.counter.count(&kept)
                );
                return Ok(Prompt { user, truncated: true });
            }

            available = available
                .checked_sub(total - self.prompt_limit)
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    YoutextError::Summarization(
                        "Prompt does not fit the context window".to_string(),
                    )
                })?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractors::extract_video_id;
    use crate::transcript::TranscriptSegment;
    use mockall::predicate::eq;
    use std::sync::{Arc, Mutex};

    fn transcript(words: usize) -> Transcript {
        let segments = (0..words)
            .map(|i| TranscriptSegment {
                text: format!("word{}", i),
                start: i as f64,
                duration: 1.0,
            })
            .collect();

        Transcript {
            video_id: extract_video_id("dQw4w9WgXcQ").unwrap(),
            language: "en".to_string(),
            is_generated: true,
            segments,
        }
    }

    fn prompt_tokens(system: &str, user: &str) -> usize {
        let bpe = tiktoken_rs::o200k_base_singleton();
        bpe.encode_with_special_tokens(system).len() + bpe.encode_with_special_tokens(user).len()
    }

    fn summarizer(client: MockCompletionClient, limit: usize, policy: ContextPolicy) -> Summarizer {
        Summarizer::new(
            Box::new(client),
            TokenCounter::for_model("gpt-4o").unwrap(),
            limit,
            policy,
            4,
        )
    }

    #[tokio::test]
    async fn test_under_limit_passes_full_text() {
        let transcript = transcript(20);
        let expected_user = format!("{}{}", SUMMARY_PREFIX, transcript.text());

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .with(eq(SUMMARY_SYSTEM), eq(expected_user))
            .times(1)
            .returning(|_, _| Ok("A short summary.".to_string()));

        let summary = summarizer(client, 10_000, ContextPolicy::Truncate)
            .summarize(&transcript)
            .await
            .unwrap();

        assert_eq!(summary.text, "A short summary.");
        assert_eq!(summary.completion_calls, 1);
        assert!(!summary.truncated);
    }

    #[tokio::test]
    async fn test_over_limit_truncates_before_completion() {
        let transcript = transcript(2_000);
        let limit = 300;

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(move |system, user| {
                user.starts_with(SUMMARY_PREFIX)
                    && user.contains("word0 word1 word2")
                    && !user.contains("word1999")
                    && prompt_tokens(system, user) <= limit
            })
            .times(1)
            .returning(|_, _| Ok("Truncated summary.".to_string()));

        let summary = summarizer(client, limit, ContextPolicy::Truncate)
            .summarize(&transcript)
            .await
            .unwrap();

        assert_eq!(summary.text, "Truncated summary.");
        assert!(summary.truncated);
    }

    #[tokio::test]
    async fn test_map_reduce_summarizes_chunks_then_combines() {
        let transcript = transcript(2_000);
        let limit = 600;
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&prompts);

        let mut client = MockCompletionClient::new();
        client.expect_complete().returning(move |system, user| {
            assert!(prompt_tokens(system, user) <= limit);
            let mut seen = seen.lock().unwrap();
            seen.push(user.to_string());
            Ok(format!("partial{}", seen.len()))
        });

        let summary = summarizer(client, limit, ContextPolicy::MapReduce)
            .summarize(&transcript)
            .await
            .unwrap();

        let prompts = prompts.lock().unwrap();
        let chunk_calls = prompts.len() - 1;
        assert!(chunk_calls > 1);
        assert_eq!(summary.completion_calls, prompts.len());
        assert_eq!(summary.text, format!("partial{}", prompts.len()));

        let expected_reduce: Vec<String> =
            (1..=chunk_calls).map(|i| format!("partial{}", i)).collect();
        assert_eq!(
            prompts.last().unwrap(),
            &format!("{}{}", SUMMARY_PREFIX, expected_reduce.join(" "))
        );
        assert!(prompts[0].contains("word0 "));
        assert!(prompts[chunk_calls - 1].contains("word1999"));
    }

    #[tokio::test]
    async fn test_map_reduce_single_chunk_is_one_call() {
        let transcript = transcript(10);

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .times(1)
            .returning(|_, _| Ok("Only summary.".to_string()));

        let summary = summarizer(client, 10_000, ContextPolicy::MapReduce)
            .summarize(&transcript)
            .await
            .unwrap();

        assert_eq!(summary.text, "Only summary.");
        assert_eq!(summary.completion_calls, 1);
    }

    #[tokio::test]
    async fn test_outline_uses_timestamps() {
        let transcript = transcript(3);

        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .withf(|system, user| {
                system == OUTLINE_SYSTEM
                    && user == format!("{}[0s] word0\n[1s] word1\n[2s] word2", OUTLINE_PREFIX)
            })
            .times(1)
            .returning(|_, _| Ok("1. Intro".to_string()));

        let outline = summarizer(client, 10_000, ContextPolicy::Truncate)
            .outline(&transcript)
            .await
            .unwrap();

        assert_eq!(outline.text, "1. Intro");
    }

    #[tokio::test]
    async fn test_completion_errors_pass_through() {
        let mut client = MockCompletionClient::new();
        client
            .expect_complete()
            .returning(|_, _| Err(YoutextError::Summarization("rate limited".to_string())));

        let err = summarizer(client, 10_000, ContextPolicy::Truncate)
            .summarize(&transcript(5))
            .await
            .unwrap_err();

        assert!(matches!(err, YoutextError::Summarization(ref msg) if msg == "rate limited"));
    }

    #[tokio::test]
    async fn test_tiny_context_window_is_rejected() {
        let mut client = MockCompletionClient::new();
        client.expect_complete().times(0);

        let err = summarizer(client, 5, ContextPolicy::Truncate)
            .summarize(&transcript(100))
            .await
            .unwrap_err();

        assert!(matches!(err, YoutextError::Summarization(_)));
    }

    #[test]
    fn test_from_config_reserves_completion_tokens() {
        let mut config = Config::default();
        config.openai.context_window = Some(16_000);
        config.openai.max_tokens = 1_000;

        let summarizer =
            Summarizer::from_config(&config, Box::new(MockCompletionClient::new())).unwrap();
        assert_eq!(summarizer.prompt_limit, 15_000);
        assert_eq!(summarizer.policy, ContextPolicy::Truncate);
    }
}
