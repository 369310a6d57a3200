//! Thin Discord REST client used for report delivery and message previews.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::delivery::{
    DeliveryError, DeliveryTarget, DeliveryUnit, PreviewSource, ReportPublisher,
};
use crate::report::ReportEmbed;

pub const DEFAULT_API_URL: &str = "https://discord.com/api/v10";

static PERMALINK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/channels/(\d+)/(\d+)/(\d+)/?$").unwrap());

/// Extracts (guild, channel, message) ids from a message permalink.
pub(crate) fn parse_permalink(url: &str) -> Option<(i64, i64, i64)> {
    let caps = PERMALINK.captures(url)?;
    let guild = caps.get(1)?.as_str().parse().ok()?;
    let channel = caps.get(2)?.as_str().parse().ok()?;
    let message = caps.get(3)?.as_str().parse().ok()?;
    Some((guild, channel, message))
}

pub struct DiscordClient {
    http: reqwest::Client,
    token: String,
    api_url: String,
}

impl DiscordClient {
    pub fn new(token: &str, api_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            token: token.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, DeliveryError> {
        let response = self
            .http
            .post(format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bot {}", self.token))
            .json(body)
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Response(format!("{status}: {body}")));
        }
        response
            .json()
            .await
            .map_err(|e| DeliveryError::Response(e.to_string()))
    }

    async fn get(&self, path: &str) -> Result<Value, DeliveryError> {
        let response = self
            .http
            .get(format!("{}{}", self.api_url, path))
            .header("Authorization", format!("Bot {}", self.token))
            .send()
            .await
            .map_err(|e| DeliveryError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Response(status.to_string()));
        }
        response
            .json()
            .await
            .map_err(|e| DeliveryError::Response(e.to_string()))
    }

    pub async fn send_message(
        &self,
        channel_id: i64,
        content: Option<&str>,
        embeds: &[ReportEmbed],
    ) -> Result<(), DeliveryError> {
        let mut body = json!({});
        if let Some(content) = content {
            body["content"] = json!(content);
        }
        if !embeds.is_empty() {
            body["embeds"] = Value::Array(embeds.iter().map(ReportEmbed::to_json).collect());
        }
        self.post(&format!("/channels/{channel_id}/messages"), &body)
            .await
            .map(|_| ())
    }

    /// Creates a forum thread whose starter message is `content` and returns
    /// the thread's channel id.
    pub async fn create_forum_thread(
        &self,
        channel_id: i64,
        title: &str,
        content: &str,
    ) -> Result<i64, DeliveryError> {
        let body = json!({
            "name": title,
            "message": { "content": content },
        });
        let response = self
            .post(&format!("/channels/{channel_id}/threads"), &body)
            .await?;
        response["id"]
            .as_str()
            .and_then(|id| id.parse().ok())
            .ok_or_else(|| DeliveryError::Response("thread id missing from response".into()))
    }
}

#[async_trait]
impl ReportPublisher for DiscordClient {
    async fn publish(
        &self,
        target: &DeliveryTarget,
        header: &str,
        units: &[DeliveryUnit],
    ) -> Result<(), DeliveryError> {
        let channel_id = match target {
            DeliveryTarget::Channel { channel_id } => {
                self.send_message(*channel_id, Some(header), &[]).await?;
                *channel_id
            }
            DeliveryTarget::Forum { channel_id, thread_title } => {
                // The header becomes the thread starter; units follow inside.
                self.create_forum_thread(*channel_id, thread_title, header)
                    .await?
            }
        };

        for unit in units {
            match unit {
                DeliveryUnit::Text(text) => {
                    self.send_message(channel_id, Some(text), &[]).await?;
                }
                DeliveryUnit::Embeds(embeds) => {
                    self.send_message(channel_id, None, embeds).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PreviewSource for DiscordClient {
    async fn message_preview(&self, url: &str, max_len: usize) -> Option<String> {
        let Some((_, channel_id, message_id)) = parse_permalink(url) else {
            debug!(url, "permalink did not parse, skipping preview");
            return None;
        };
        match self
            .get(&format!("/channels/{channel_id}/messages/{message_id}"))
            .await
        {
            Ok(message) => {
                let content = message["content"].as_str().unwrap_or_default();
                Some(content.chars().take(max_len).collect())
            }
            Err(e) => {
                warn!(url, "failed to fetch message preview: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permalink_parses_ids() {
        let url = "https://discord.com/channels/111/222/333";
        assert_eq!(parse_permalink(url), Some((111, 222, 333)));
    }

    #[test]
    fn bad_permalinks_are_rejected() {
        assert_eq!(parse_permalink("https://discord.com/channels/111/222"), None);
        assert_eq!(parse_permalink("https://example.com/"), None);
        assert_eq!(parse_permalink("not a url"), None);
    }
}
