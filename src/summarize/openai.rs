use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::CompletionClient;
use crate::config::OpenAiConfig;
use crate::{Result, YoutextError};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints
pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: usize,
    temperature: Option<f32>,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig, api_key: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("youtext/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| YoutextError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key: api_key.into(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: system },
                ChatMessage { role: "user", content: user },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::debug!("Sending completion request to {} ({})", self.endpoint, self.model);

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    YoutextError::Network(format!("Failed to reach completion API: {}", e))
                } else {
                    YoutextError::Summarization(format!(
                        "Failed to send request to completion API: {}",
                        e
                    ))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(YoutextError::Summarization(format!(
                "Completion API error {}: {}",
                status, detail
            )));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            YoutextError::Summarization(format!("Failed to parse completion API response: {}", e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .unwrap_or_default();

        if content.is_empty() {
            return Err(YoutextError::Summarization(
                "Completion API returned an empty response".to_string(),
            ));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let config = OpenAiConfig {
            api_base: format!("{}/v1/", server.uri()),
            ..OpenAiConfig::default()
        };
        OpenAiClient::new(&config, "test-key").unwrap()
    }

    #[test]
    fn test_request_structure() {
        let request = ChatRequest {
            model: "gpt-4o",
            messages: vec![ChatMessage { role: "user", content: "test" }],
            max_tokens: 4096,
            temperature: None,
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["max_tokens"], 4096);
        assert!(value.get("temperature").is_none());
    }

    #[tokio::test]
    async fn test_complete_returns_trimmed_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "model": "gpt-4o",
                "max_tokens": 4096,
                "messages": [
                    { "role": "system", "content": "be brief" },
                    { "role": "user", "content": "summarize this" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  A summary.\n" } }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).complete("be brief", "summarize this").await.unwrap();
        assert_eq!(text, "A summary.");
    }

    #[tokio::test]
    async fn test_api_error_message_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {
                    "message": "Incorrect API key provided",
                    "type": "invalid_request_error"
                }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        match err {
            YoutextError::Summarization(msg) => {
                assert!(msg.contains("401"), "{msg}");
                assert!(msg.contains("Incorrect API key provided"), "{msg}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_rate_limit_with_plain_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(
            err,
            YoutextError::Summarization(ref msg) if msg.contains("429") && msg.contains("slow down")
        ));
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, YoutextError::Summarization(_)));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_network_error() {
        let config = OpenAiConfig {
            api_base: "http://127.0.0.1:1/v1".to_string(),
            ..OpenAiConfig::default()
        };
        let client = OpenAiClient::new(&config, "test-key").unwrap();

        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, YoutextError::Network(_)), "{err:?}");
    }
}
