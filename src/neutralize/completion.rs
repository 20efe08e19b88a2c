// Remote chat-completion client (OpenAI-compatible `/chat/completions`).
//
// Wrapped behind the CompletionClient trait so the orchestrator can be tested
// with a stub and pointed at any compatible server via OPENAI_BASE_URL.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Sampling temperature for rewrites and explanations.
pub const COMPLETION_TEMPERATURE: f32 = 0.5;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Send one system + user exchange to `model` and return the reply text.
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
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
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: String, base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, model: &str, system: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model,
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
            temperature: COMPLETION_TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to call the completion API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Completion API returned {}: {}", status, error_message(&body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .context("Failed to parse completion response")?;
        let text = first_choice_text(parsed)?;
        debug!(model, chars = text.len(), "Completion received");
        Ok(text)
    }
}

fn first_choice_text(response: ChatResponse) -> Result<String> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_string())
        .context("Completion response contained no message")
}

/// Pull the human-readable message out of an API error body, falling back
/// to the first 200 characters of the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorResponse>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_shape() {
        let request = ChatRequest {
            model: "gpt-4",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi",
            }],
            temperature: COMPLETION_TEMPERATURE,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["temperature"], 0.5);
    }

    #[test]
    fn test_first_choice_is_trimmed() {
        let parsed: ChatResponse = serde_json::from_str(
            r#"{"choices":[{"message":{"role":"assistant","content":"  neutral text \n"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(parsed).unwrap(), "neutral text");
    }

    #[test]
    fn test_empty_choices_is_error() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(first_choice_text(parsed).is_err());
    }

    #[test]
    fn test_error_message_extraction() {
        assert_eq!(
            error_message(r#"{"error":{"message":"Invalid API key","type":"auth"}}"#),
            "Invalid API key"
        );
        assert_eq!(error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OpenAiClient::new("k".to_string(), "https://api.test/v1/").unwrap();
        assert_eq!(client.base_url, "https://api.test/v1");
    }
}
