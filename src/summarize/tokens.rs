use tiktoken_rs::{CoreBPE, Rank};

use crate::{Result, YoutextError};

/// Token estimation backed by the tiktoken BPE of the target model
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    /// Tokenizer for `model`, falling back to `o200k_base` for unknown models
    pub fn for_model(model: &str) -> Result<Self> {
        let bpe = tiktoken_rs::get_bpe_from_model(model)
            .or_else(|_| {
                tracing::debug!("No tokenizer registered for {}, using o200k_base", model);
                tiktoken_rs::o200k_base()
            })
            .map_err(|e| YoutextError::Summarization(format!("Failed to load tokenizer: {}", e)))?;

        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        self.encode(text).len()
    }

    /// Keep the earliest tokens of `text` so that it counts at most `max_tokens`
    pub fn truncate(&self, text: &str, max_tokens: usize) -> Result<String> {
        let tokens = self.encode(text);
        if tokens.len() <= max_tokens {
            return Ok(text.to_string());
        }

        self.fit_prefix(&tokens, max_tokens).map(|(prefix, _)| prefix)
    }

    /// Split `text` into consecutive chunks of at most `max_tokens` each.
    ///
    /// Concatenating the chunks yields `text` again.
    pub fn split(&self, text: &str, max_tokens: usize) -> Result<Vec<String>> {
        let tokens = self.encode(text);
        let mut chunks = Vec::new();
        let mut pos = 0;

        while pos < tokens.len() {
            let (chunk, used) = self.fit_prefix(&tokens[pos..], max_tokens)?;
            chunks.push(chunk);
            pos += used;
        }

        Ok(chunks)
    }

    fn encode(&self, text: &str) -> Vec<Rank> {
        self.bpe.encode_with_special_tokens(text)
    }

    /// Decode the longest prefix of `tokens` that is valid UTF-8 and re-counts
    /// within `max_tokens`. Returns the text and the number of tokens consumed.
    fn fit_prefix(&self, tokens: &[Rank], max_tokens: usize) -> Result<(String, usize)> {
        let mut end = tokens.len().min(max_tokens);

        while end > 0 {
            match self.bpe.decode(tokens[..end].to_vec()) {
                Ok(text) => {
                    let count = self.count(&text);
                    if count <= max_tokens {
                        return Ok((text, end));
                    }
                    end -= (count - max_tokens).min(end);
                }
                // Cut inside a multi-byte character
                Err(_) => end -= 1,
            }
        }

        Err(YoutextError::Summarization(format!(
            "Unable to fit text into {} tokens",
            max_tokens
        )))
    }
}
