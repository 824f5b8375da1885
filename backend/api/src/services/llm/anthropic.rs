//! `LlmClient` backed by the Anthropic Messages API.
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::constants::llm::{
    ANTHROPIC_API_KEY, ANTHROPIC_API_VERSION, ANTHROPIC_BASE_URL, ANTHROPIC_MODEL, MAX_TOKENS,
};

use super::{errors::LlmError, LlmClient};

pub struct AnthropicClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl AnthropicClient {
    pub fn new(api_key: String, base_url: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url,
            model,
        }
    }

    /// Build a client from the process configuration. `None` when no API key
    /// is configured.
    pub fn from_config() -> Option<Self> {
        ANTHROPIC_API_KEY.as_ref().map(|api_key| {
            Self::new(
                api_key.clone(),
                ANTHROPIC_BASE_URL.trim_end_matches('/').to_owned(),
                ANTHROPIC_MODEL.clone(),
            )
        })
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "model": self.model,
            "max_tokens": MAX_TOKENS,
            "messages": [{"role": "user", "content": prompt}],
        })
    }
}

/// Concatenate the text blocks of a Messages API response.
fn message_text(body: &Value) -> Result<String, LlmError> {
    let text: String = body
        .get("content")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter(|block| block.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|block| block.get("text").and_then(Value::as_str))
        .collect();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyReply);
    }
    Ok(text)
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .json(&self.request_body(prompt))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        let body: Value = response.json().await?;
        message_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_carries_model_and_prompt() {
        let client = AnthropicClient::new(
            String::from("key"),
            String::from("http://localhost"),
            String::from("test-model"),
        );
        let body = client.request_body("Ask me about bases");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["max_tokens"], MAX_TOKENS);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "Ask me about bases");
    }

    #[test]
    fn message_text_joins_text_blocks() {
        let body = json!({
            "content": [
                {"type": "text", "text": "[{\"a\": "},
                {"type": "tool_use", "name": "ignored"},
                {"type": "text", "text": "1}]"}
            ]
        });
        assert_eq!(message_text(&body).unwrap(), "[{\"a\": 1}]");
    }

    #[test]
    fn message_text_without_text_is_an_error() {
        assert!(matches!(
            message_text(&json!({"content": []})),
            Err(LlmError::EmptyReply)
        ));
        assert!(matches!(
            message_text(&json!({"error": "overloaded"})),
            Err(LlmError::EmptyReply)
        ));
    }
}
