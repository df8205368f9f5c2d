/// LLM Client — the single point of entry for chat-completion calls.
///
/// ARCHITECTURAL RULE: No other module may call the LLM HTTP API directly.
///
/// Speaks the OpenAI-compatible chat completions protocol (Groq by default).
/// Each `call` is exactly one HTTP attempt: retry policy belongs to the caller,
/// which is why a 429 surfaces as `LlmError::RateLimited` instead of being retried here.
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";
/// The model used for skill classification.
pub const MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const MAX_TOKENS: u32 = 500;
const REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Rate limited (status 429): {0}")]
    RateLimited(String),

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl LlmResponse {
    /// Extracts the text content of the first choice.
    pub fn text(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .filter(|t| !t.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl LlmClient {
    pub fn with_api_url(api_key: String, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()
                .unwrap_or_else(|_| Client::new()),
            api_key,
            api_url: api_url.into(),
        }
    }

    /// Makes one chat-completion call with deterministic sampling.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, LlmError> {
        let request_body = ChatRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            temperature: 0.0,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();

        if status.as_u16() == 429 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::RateLimited(body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let llm_response: LlmResponse = response.json().await?;

        if let Some(usage) = &llm_response.usage {
            debug!(
                "LLM call succeeded: prompt_tokens={}, completion_tokens={}",
                usage.prompt_tokens, usage.completion_tokens
            );
        }

        Ok(llm_response)
    }

    /// Calls the LLM and deserializes the text response as JSON.
    /// The prompt must instruct the model to return valid JSON.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system).await?;

        let text = response.text().ok_or(LlmError::EmptyContent)?;

        // Strip markdown code fences if the model wraps JSON in them
        let text = strip_json_fences(text);

        serde_json::from_str(text).map_err(LlmError::Parse)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "choices": [{"message": {"role": "assistant", "content": content}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3}
        })
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n[\"Python\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"Python\"]");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n[\"Python\"]\n```";
        assert_eq!(strip_json_fences(input), "[\"Python\"]");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "[\"Python\"]";
        assert_eq!(strip_json_fences(input), "[\"Python\"]");
    }

    #[tokio::test]
    async fn test_call_json_parses_fenced_array() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat")
                    .header("authorization", "Bearer secret");
                then.status(200)
                    .json_body(completion("```json\n[\"Python\", \"React\"]\n```"));
            })
            .await;

        let client = LlmClient::with_api_url("secret".to_string(), server.url("/chat"));
        let skills: Vec<String> = client.call_json("prompt", "system").await.unwrap();

        mock.assert_hits_async(1).await;
        assert_eq!(skills, vec!["Python", "React"]);
    }

    #[tokio::test]
    async fn test_429_maps_to_rate_limited_without_retry() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(429).body("rate_limit_exceeded");
            })
            .await;

        let client = LlmClient::with_api_url("secret".to_string(), server.url("/chat"));
        let err = client.call("prompt", "system").await.unwrap_err();

        mock.assert_hits_async(1).await;
        assert!(matches!(err, LlmError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_api_error_message_is_extracted() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(401)
                    .json_body(json!({"error": {"message": "Invalid API Key"}}));
            })
            .await;

        let client = LlmClient::with_api_url("bad".to_string(), server.url("/chat"));
        let err = client.call("prompt", "system").await.unwrap_err();
        assert!(
            matches!(err, LlmError::Api { status: 401, ref message } if message == "Invalid API Key")
        );
    }

    #[tokio::test]
    async fn test_empty_content_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat");
                then.status(200).json_body(completion("   "));
            })
            .await;

        let client = LlmClient::with_api_url("secret".to_string(), server.url("/chat"));
        let err = client
            .call_json::<Vec<String>>("prompt", "system")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
