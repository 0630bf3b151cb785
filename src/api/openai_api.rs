use crate::config::LlmConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint
pub struct OpenAiClient {
    api_key: String,
    base_url: String,
    model: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl OpenAiClient {
    pub fn new(api_key: String, config: &LlmConfig) -> Self {
        Self {
            api_key,
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            client: reqwest::Client::new(),
        }
    }

    /// Send a single user message and return the text of the first choice
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to reach chat completions API")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Chat completions API returned error: {} {}", status, body);
        }

        let chat: ChatResponse = response
            .json()
            .await
            .context("Failed to parse chat completions response")?;

        debug!(choices = chat.choices.len(), "Chat completion received");

        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .context("Chat completion contained no message content")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{
        matchers::{body_partial_json, header, method, path},
        Mock, MockServer, ResponseTemplate,
    };

    fn test_config(base_url: String) -> LlmConfig {
        LlmConfig {
            api_key: None,
            base_url,
            model: "gpt-4o".to_string(),
            max_tokens: 300,
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o", "max_tokens": 300 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "{\"totalOdds\": 2.1, \"bets\": []}" } }]
            })))
            .mount(&mock_server)
            .await;

        let client = OpenAiClient::new("sk-test".to_string(), &test_config(mock_server.uri()));
        let content = client.complete("hello").await.unwrap();
        assert!(content.contains("totalOdds"));
    }

    #[tokio::test]
    async fn test_complete_fails_on_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&mock_server)
            .await;

        let client = OpenAiClient::new("sk-test".to_string(), &test_config(mock_server.uri()));
        let err = client.complete("hello").await.unwrap_err();
        assert!(err.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_complete_fails_without_choices() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&mock_server)
            .await;

        let client = OpenAiClient::new("sk-test".to_string(), &test_config(mock_server.uri()));
        assert!(client.complete("hello").await.is_err());
    }
}
