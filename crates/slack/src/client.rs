//! Slack Web API access.
//!
//! Handlers depend on the [`SlackApi`] trait; [`HttpSlackClient`] is the
//! production implementation and [`fake::FakeSlackApi`] backs tests.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use hindsight_core::payload::{FilePayload, MessagePayload};

#[derive(Debug, Error)]
pub enum SlackApiError {
    #[error("slack transport error: {0}")]
    Transport(String),
    #[error("slack api call `{method}` failed: {error}")]
    Api { method: String, error: String },
    #[error("file download failed with status {0}")]
    Download(u16),
    #[error("could not decode slack response for `{method}`: {error}")]
    Decode { method: String, error: String },
}

/// Channel facts the handlers need.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelInfo {
    pub topic: String,
    pub purpose: String,
    pub is_private: bool,
    /// One of `channel`, `group`, `im`, `mpim`, or `unknown`.
    pub channel_type: String,
}

/// File metadata plus inline content, as returned by `files.info`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FileInfo {
    pub file: FilePayload,
    pub content: Option<String>,
}

#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn get_permalink(&self, channel: &str, message_ts: &str)
        -> Result<String, SlackApiError>;

    async fn conversations_info(&self, channel: &str) -> Result<ChannelInfo, SlackApiError>;

    /// Thread replies ordered oldest first, root message included.
    async fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<MessagePayload>, SlackApiError>;

    async fn files_info(&self, file_id: &str) -> Result<FileInfo, SlackApiError>;

    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackApiError>;

    /// Downloads a private file with bearer auth. Any non-200 status is
    /// fatal for the ingestion of that file.
    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackApiError>;
}

pub struct HttpSlackClient {
    bot_token: SecretString,
    http: reqwest::Client,
    base_url: String,
}

impl HttpSlackClient {
    pub fn new(bot_token: SecretString) -> Result<Self, SlackApiError> {
        Self::with_base_url(bot_token, "https://slack.com/api")
    }

    pub fn with_base_url(bot_token: SecretString, base_url: &str) -> Result<Self, SlackApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| SlackApiError::Transport(err.to_string()))?;
        Ok(Self { bot_token, http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    async fn call(&self, method: &str, params: &[(&str, &str)]) -> Result<Value, SlackApiError> {
        debug!(method, "calling slack api");
        let response = self
            .http
            .get(format!("{}/{method}", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .query(params)
            .send()
            .await
            .map_err(|err| SlackApiError::Transport(err.to_string()))?;
        let body: Value = response.json().await.map_err(|err| SlackApiError::Decode {
            method: method.to_string(),
            error: err.to_string(),
        })?;
        if !body["ok"].as_bool().unwrap_or(false) {
            return Err(SlackApiError::Api {
                method: method.to_string(),
                error: body["error"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        Ok(body)
    }

    fn decode<T: serde::de::DeserializeOwned>(
        method: &str,
        value: Value,
    ) -> Result<T, SlackApiError> {
        serde_json::from_value(value).map_err(|err| SlackApiError::Decode {
            method: method.to_string(),
            error: err.to_string(),
        })
    }
}

#[async_trait]
impl SlackApi for HttpSlackClient {
    async fn get_permalink(
        &self,
        channel: &str,
        message_ts: &str,
    ) -> Result<String, SlackApiError> {
        let body = self
            .call("chat.getPermalink", &[("channel", channel), ("message_ts", message_ts)])
            .await?;
        Ok(body["permalink"].as_str().unwrap_or_default().to_string())
    }

    async fn conversations_info(&self, channel: &str) -> Result<ChannelInfo, SlackApiError> {
        let body = self.call("conversations.info", &[("channel", channel)]).await?;
        let channel = &body["channel"];
        let channel_type = if channel["is_channel"].as_bool().unwrap_or(false) {
            "channel"
        } else if channel["is_group"].as_bool().unwrap_or(false) {
            "group"
        } else if channel["is_im"].as_bool().unwrap_or(false) {
            "im"
        } else if channel["is_mpim"].as_bool().unwrap_or(false) {
            "mpim"
        } else {
            "unknown"
        };
        Ok(ChannelInfo {
            topic: channel["topic"]["value"].as_str().unwrap_or_default().to_string(),
            purpose: channel["purpose"]["value"].as_str().unwrap_or_default().to_string(),
            is_private: channel["is_private"].as_bool().unwrap_or(false),
            channel_type: channel_type.to_string(),
        })
    }

    async fn conversations_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<Vec<MessagePayload>, SlackApiError> {
        let body =
            self.call("conversations.replies", &[("channel", channel), ("ts", thread_ts)]).await?;
        Self::decode("conversations.replies", body["messages"].clone())
    }

    async fn files_info(&self, file_id: &str) -> Result<FileInfo, SlackApiError> {
        let body = self.call("files.info", &[("file", file_id)]).await?;
        let file: FilePayload = Self::decode("files.info", body["file"].clone())?;
        let content = body["content"].as_str().map(str::to_string);
        Ok(FileInfo { file, content })
    }

    async fn post_message(
        &self,
        channel: &str,
        thread_ts: Option<&str>,
        text: &str,
    ) -> Result<(), SlackApiError> {
        let mut payload = serde_json::json!({ "channel": channel, "text": text });
        if let Some(thread_ts) = thread_ts {
            payload["thread_ts"] = thread_ts.into();
        }
        let response = self
            .http
            .post(format!("{}/chat.postMessage", self.base_url))
            .bearer_auth(self.bot_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(|err| SlackApiError::Transport(err.to_string()))?;
        let body: Value = response.json().await.map_err(|err| SlackApiError::Decode {
            method: "chat.postMessage".to_string(),
            error: err.to_string(),
        })?;
        if !body["ok"].as_bool().unwrap_or(false) {
            return Err(SlackApiError::Api {
                method: "chat.postMessage".to_string(),
                error: body["error"].as_str().unwrap_or("unknown").to_string(),
            });
        }
        Ok(())
    }

    async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackApiError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(self.bot_token.expose_secret())
            .send()
            .await
            .map_err(|err| SlackApiError::Transport(err.to_string()))?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(SlackApiError::Download(response.status().as_u16()));
        }
        let bytes =
            response.bytes().await.map_err(|err| SlackApiError::Transport(err.to_string()))?;
        Ok(bytes.to_vec())
    }
}

pub mod fake {
    //! Scriptable [`SlackApi`] for handler tests.

    use std::collections::HashMap;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    pub struct FakeSlackApi {
        pub channel_info: Mutex<HashMap<String, ChannelInfo>>,
        pub files: Mutex<HashMap<String, FileInfo>>,
        pub replies: Mutex<HashMap<String, Vec<MessagePayload>>>,
        pub downloads: Mutex<HashMap<String, Vec<u8>>>,
        pub posted: Mutex<Vec<(String, Option<String>, String)>>,
    }

    impl FakeSlackApi {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn posted_messages(&self) -> Vec<(String, Option<String>, String)> {
            self.posted.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl SlackApi for FakeSlackApi {
        async fn get_permalink(
            &self,
            channel: &str,
            message_ts: &str,
        ) -> Result<String, SlackApiError> {
            Ok(format!("https://example.slack.com/archives/{channel}/p{message_ts}"))
        }

        async fn conversations_info(&self, channel: &str) -> Result<ChannelInfo, SlackApiError> {
            Ok(self
                .channel_info
                .lock()
                .expect("lock")
                .get(channel)
                .cloned()
                .unwrap_or(ChannelInfo {
                    channel_type: "channel".into(),
                    ..ChannelInfo::default()
                }))
        }

        async fn conversations_replies(
            &self,
            channel: &str,
            thread_ts: &str,
        ) -> Result<Vec<MessagePayload>, SlackApiError> {
            Ok(self
                .replies
                .lock()
                .expect("lock")
                .get(&format!("{channel}:{thread_ts}"))
                .cloned()
                .unwrap_or_default())
        }

        async fn files_info(&self, file_id: &str) -> Result<FileInfo, SlackApiError> {
            self.files.lock().expect("lock").get(file_id).cloned().ok_or_else(|| {
                SlackApiError::Api {
                    method: "files.info".into(),
                    error: "file_not_found".into(),
                }
            })
        }

        async fn post_message(
            &self,
            channel: &str,
            thread_ts: Option<&str>,
            text: &str,
        ) -> Result<(), SlackApiError> {
            self.posted.lock().expect("lock").push((
                channel.to_string(),
                thread_ts.map(str::to_string),
                text.to_string(),
            ));
            Ok(())
        }

        async fn download_file(&self, url: &str) -> Result<Vec<u8>, SlackApiError> {
            self.downloads
                .lock()
                .expect("lock")
                .get(url)
                .cloned()
                .ok_or(SlackApiError::Download(404))
        }
    }
}
