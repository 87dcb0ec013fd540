use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::RagError;
use crate::core::config::settings::OpenAiSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// The generated answer, or `None` when the model returned no text.
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<Option<String>, RagError>;
}

/// OpenAI chat-completions client.
#[derive(Clone)]
pub struct OpenAiChatModel {
    base_url: String,
    api_key: String,
    model: String,
    temperature: Option<f64>,
    max_tokens: Option<u32>,
    client: Client,
}

impl OpenAiChatModel {
    pub fn new(settings: &OpenAiSettings, api_key: &str, client: Client) -> Self {
        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
            client,
        }
    }

    fn request_body(&self, messages: &[ChatMessage]) -> Value {
        let mut body = json!({
            "model": self.model,
            "messages": messages,
            "stream": false,
        });

        if let Some(obj) = body.as_object_mut() {
            if let Some(t) = self.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(t) = self.max_tokens {
                obj.insert("max_tokens".to_string(), json!(t));
            }
        }
        body
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiChatModel {
    async fn generate(&self, messages: Vec<ChatMessage>) -> Result<Option<String>, RagError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.request_body(&messages);

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(RagError::generation)?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::Generation(format!("{}: {}", status, text)));
        }

        let payload: Value = res.json().await.map_err(RagError::generation)?;
        Ok(extract_answer(&payload))
    }
}

fn extract_answer(payload: &Value) -> Option<String> {
    payload["choices"][0]["message"]["content"]
        .as_str()
        .map(str::trim)
        .filter(|content| !content.is_empty())
        .map(str::to_string)
}
