use crate::error::SearchError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

pub const DEFAULT_CHAT_MODEL: &str = "gpt-4o-mini";

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Sends one prompt as a single user message and returns the raw completion text.
    async fn complete(&self, prompt: &str) -> Result<String, SearchError>;
}

#[async_trait]
impl<T: LanguageModel + ?Sized> LanguageModel for Arc<T> {
    async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
        (**self).complete(prompt).await
    }
}

pub struct OpenAiChatModel {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

impl OpenAiChatModel {
    pub fn new(base_url: impl AsRef<str>, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: format!("{}/chat/completions", base_url.as_ref().trim_end_matches('/')),
            api_key: api_key.into(),
            model: model.into(),
            temperature: 0.0,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiChatModel {
    async fn complete(&self, prompt: &str) -> Result<String, SearchError> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "chat completion");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                temperature: self.temperature,
                messages: [ChatMessage {
                    role: "user",
                    content: prompt,
                }],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::BackendResponse {
                backend: "openai-chat".to_string(),
                details: format!("{status}: {body}"),
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content.unwrap_or_default())
            .ok_or_else(|| SearchError::BackendResponse {
                backend: "openai-chat".to_string(),
                details: "response had no choices".to_string(),
            })
    }
}
