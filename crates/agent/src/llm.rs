//! Chat model access.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// Error categories that map to distinct user-facing apologies.
#[derive(Debug, Error)]
pub enum ChatModelError {
    #[error("model quota exhausted: {0}")]
    Quota(String),
    #[error("invalid chat request: {0}")]
    InvalidRequest(String),
    #[error("chat model failure: {0}")]
    Other(String),
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(
        &self,
        model: &str,
        temperature: f64,
        messages: &[ChatMessage],
    ) -> Result<String, ChatModelError>;
}

pub struct OpenAiChatModel {
    api_key: SecretString,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiChatModel {
    pub fn new(api_key: SecretString, timeout_secs: u64) -> Result<Self, ChatModelError> {
        Self::with_base_url(api_key, timeout_secs, "https://api.openai.com/v1")
    }

    pub fn with_base_url(
        api_key: SecretString,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, ChatModelError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|err| ChatModelError::Other(err.to_string()))?;
        Ok(Self { api_key, http, base_url: base_url.trim_end_matches('/').to_string() })
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat(
        &self,
        model: &str,
        temperature: f64,
        messages: &[ChatMessage],
    ) -> Result<String, ChatModelError> {
        let response = self
            .http
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": model,
                "temperature": temperature,
                "messages": messages,
            }))
            .send()
            .await
            .map_err(|err| ChatModelError::Other(err.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|err| ChatModelError::Other(err.to_string()))?;

        if !status.is_success() {
            let detail = body["error"]["message"].as_str().unwrap_or("unknown").to_string();
            let code = body["error"]["code"].as_str().unwrap_or_default();
            return Err(match status.as_u16() {
                429 => ChatModelError::Quota(detail),
                _ if code == "insufficient_quota" => ChatModelError::Quota(detail),
                400 => ChatModelError::InvalidRequest(detail),
                _ => ChatModelError::Other(detail),
            });
        }

        body["choices"][0]["message"]["content"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ChatModelError::Other("completion without content".to_string()))
    }
}

pub mod fake {
    //! Scriptable [`ChatModel`] for chain and handler tests.

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    pub struct FakeChatModel {
        pub responses: Mutex<VecDeque<Result<String, ChatModelError>>>,
        pub requests: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl FakeChatModel {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_responses(responses: Vec<Result<String, ChatModelError>>) -> Self {
            Self { responses: Mutex::new(responses.into()), requests: Mutex::new(Vec::new()) }
        }

        /// Scripts a single final-answer turn.
        pub fn answering(text: &str) -> Self {
            Self::with_responses(vec![Ok(format!(
                "```json\n{{\"action\": \"Final Answer\", \"action_input\": \"{text}\"}}\n```"
            ))])
        }

        pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
            self.requests.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl ChatModel for FakeChatModel {
        async fn chat(
            &self,
            _model: &str,
            _temperature: f64,
            messages: &[ChatMessage],
        ) -> Result<String, ChatModelError> {
            self.requests.lock().expect("lock").push(messages.to_vec());
            self.responses
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Ok("I don't know.".to_string()))
        }
    }
}
