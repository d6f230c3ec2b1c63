//! Outbound Messaging API client.

use {
    async_trait::async_trait,
    secrecy::{ExposeSecret, Secret},
    serde_json::json,
    tracing::debug,
};

use crate::error::{Error, Result};

const API_BASE: &str = "https://api.line.me/v2/bot";
const DATA_API_BASE: &str = "https://api-data.line.me/v2/bot";

/// Content downloads larger than this are rejected before ingestion.
pub const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Channel credentials issued by the platform.
#[derive(Clone)]
pub struct LineCredentials {
    channel_secret: Secret<String>,
    access_token: Secret<String>,
}

impl LineCredentials {
    /// Build credentials from the configured secret and token. Either one
    /// being empty means the channel is not usable and yields `None`.
    pub fn from_parts(channel_secret: &str, access_token: &str) -> Option<Self> {
        if channel_secret.is_empty() || access_token.is_empty() {
            return None;
        }
        Some(Self {
            channel_secret: Secret::new(channel_secret.to_string()),
            access_token: Secret::new(access_token.to_string()),
        })
    }

    /// Secret used to verify webhook signatures.
    pub fn channel_secret(&self) -> &str {
        self.channel_secret.expose_secret()
    }

    /// Token used to authenticate Messaging API calls.
    pub fn access_token(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl std::fmt::Debug for LineCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LineCredentials")
            .field("channel_secret", &"[REDACTED]")
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Same-turn replies and out-of-band pushes.
///
/// Delivery is best effort: callers log failures and move on, nothing is
/// retried here.
#[async_trait]
pub trait Messenger: Send + Sync {
    /// Answer the event that carried `reply_token`. Tokens are single-use.
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()>;

    /// Deliver a message outside any reply window.
    async fn push(&self, user_id: &str, text: &str) -> Result<()>;

    /// Download the binary content attached to a message.
    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>>;
}

/// Production [`Messenger`] backed by the Messaging API over HTTPS.
pub struct LineClient {
    http: reqwest::Client,
    access_token: Secret<String>,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            access_token: Secret::new(access_token.into()),
            api_base: API_BASE.to_string(),
            data_api_base: DATA_API_BASE.to_string(),
        }
    }

    /// Point the client at a different API host (tests, proxies).
    pub fn with_api_bases(
        mut self,
        api_base: impl Into<String>,
        data_api_base: impl Into<String>,
    ) -> Self {
        self.api_base = api_base.into();
        self.data_api_base = data_api_base.into();
        self
    }

    async fn post_message(&self, path: &str, body: serde_json::Value) -> Result<()> {
        let url = format!("{}{path}", self.api_base);
        let response = self
            .http
            .post(&url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::api("send failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Messenger for LineClient {
    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        debug!(chars = text.chars().count(), "sending reply");
        self.post_message(
            "/message/reply",
            json!({
                "replyToken": reply_token,
                "messages": [{"type": "text", "text": text}],
            }),
        )
        .await
    }

    async fn push(&self, user_id: &str, text: &str) -> Result<()> {
        debug!(user_id, chars = text.chars().count(), "sending push");
        self.post_message(
            "/message/push",
            json!({
                "to": user_id,
                "messages": [{"type": "text", "text": text}],
            }),
        )
        .await
    }

    async fn fetch_content(&self, message_id: &str) -> Result<Vec<u8>> {
        let url = format!("{}/message/{message_id}/content", self.data_api_base);
        let response = self
            .http
            .get(&url)
            .bearer_auth(self.access_token.expose_secret())
            .send()
            .await
            .map_err(|e| Error::api("content download failed", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data = response
            .bytes()
            .await
            .map_err(|e| Error::api("content body read failed", e))?;
        if data.len() > MAX_CONTENT_BYTES {
            return Err(Error::ContentTooLarge {
                size: data.len(),
                limit: MAX_CONTENT_BYTES,
            });
        }
        Ok(data.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_parts_yield_no_credentials() {
        assert!(LineCredentials::from_parts("", "token").is_none());
        assert!(LineCredentials::from_parts("secret", "").is_none());
        assert!(LineCredentials::from_parts("", "").is_none());
    }

    #[test]
    fn credentials_round_trip() {
        let credentials = LineCredentials::from_parts("secret", "token").unwrap();
        assert_eq!(credentials.channel_secret(), "secret");
        assert_eq!(credentials.access_token(), "token");
    }

    #[test]
    fn debug_redacts_secrets() {
        let credentials = LineCredentials::from_parts("hunter2", "tok-abc123").unwrap();
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("tok-abc123"));
        assert!(rendered.contains("[REDACTED]"));
    }
}
