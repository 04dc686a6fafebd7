// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord channel adapter for Confluo.
//!
//! Uses the REST API with a bot token. [`DiscordChannel::fetch_recent`] reads
//! the latest messages of every configured channel; `send` posts to the
//! channel id given as the recipient.

pub mod parse;

use std::time::Duration;

use async_trait::async_trait;
use confluo_config::model::DiscordConfig;
use confluo_core::{
    AdapterType, ChannelAdapter, ChannelType, ConfluoError, HealthStatus, Message, MessageId,
    OutboundMessage, PluginAdapter,
};
use futures::future::try_join_all;
use reqwest::Url;
use tracing::{debug, info};

/// Discord channel adapter implementing [`ChannelAdapter`].
#[derive(Debug, Clone)]
pub struct DiscordChannel {
    client: reqwest::Client,
    auth_header: String,
    config: DiscordConfig,
}

impl DiscordChannel {
    /// Creates a new Discord channel adapter.
    ///
    /// Requires `config.bot_token` to be set and every configured channel id
    /// to be a numeric snowflake.
    pub fn new(config: DiscordConfig) -> Result<Self, ConfluoError> {
        let token = config
            .bot_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ConfluoError::Config("discord.bot_token is required for Discord adapter".into())
            })?;

        if let Some(bad) = config.channel_ids.iter().find(|id| !parse::is_channel_id(id)) {
            return Err(ConfluoError::Config(format!(
                "discord.channel_ids contains invalid id `{bad}`: expected numeric channel id"
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfluoError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!(channels = config.channel_ids.len(), "Discord channel initialized");
        Ok(Self {
            client,
            auth_header: format!("Bot {token}"),
            config,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_base.trim_end_matches('/'))
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Vec<Message>, ConfluoError> {
        let limit = self.config.fetch_limit.to_string();
        let url = Url::parse_with_params(
            &self.url(&format!("/channels/{channel_id}/messages")),
            &[("limit", limit.as_str())],
        )
        .map_err(|e| ConfluoError::Config(format!("invalid Discord URL: {e}")))?;

        let response = self
            .client
            .get(url)
            .header("authorization", &self.auth_header)
            .send()
            .await
            .map_err(|e| ConfluoError::Channel {
                message: format!("Discord request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfluoError::channel(format!(
                "Discord channel {channel_id} returned {status}: {body}"
            )));
        }
        let raw: Vec<serde_json::Value> = response.json().await.map_err(|e| ConfluoError::Channel {
            message: format!("Discord messages response must be a JSON array: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(channel_id, count = raw.len(), "Discord messages fetched");

        raw.into_iter().map(parse::to_message).collect()
    }
}

#[async_trait]
impl PluginAdapter for DiscordChannel {
    fn name(&self) -> &str {
        "discord"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ConfluoError> {
        let response = self
            .client
            .get(self.url("/users/@me"))
            .header("authorization", &self.auth_header)
            .send()
            .await;
        match response {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) if r.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => Ok(
                HealthStatus::Degraded("Discord is rate limiting requests".into()),
            ),
            Ok(r) => Ok(HealthStatus::Unhealthy(format!(
                "Discord /users/@me returned {}",
                r.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Discord unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl ChannelAdapter for DiscordChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Discord
    }

    /// Any failing channel fails the whole fetch, so the breaker sees it.
    async fn fetch_recent(&self) -> Result<Vec<Message>, ConfluoError> {
        let per_channel =
            try_join_all(self.config.channel_ids.iter().map(|id| self.fetch_channel(id))).await?;
        Ok(per_channel.into_iter().flatten().collect())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ConfluoError> {
        if !parse::is_channel_id(&msg.to) {
            return Err(ConfluoError::Validation(format!(
                "invalid Discord target `{}`: expected numeric channel id",
                msg.to
            )));
        }

        let response = self
            .client
            .post(self.url(&format!("/channels/{}/messages", msg.to)))
            .header("authorization", &self.auth_header)
            .json(&serde_json::json!({ "content": msg.content }))
            .send()
            .await
            .map_err(|e| ConfluoError::Channel {
                message: format!("Discord send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfluoError::channel(format!(
                "Discord send returned {status}: {body}"
            )));
        }
        let sent: serde_json::Value = response.json().await.map_err(|e| ConfluoError::Channel {
            message: format!("failed to decode Discord send response: {e}"),
            source: Some(Box::new(e)),
        })?;
        let id = sent
            .get("id")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| ConfluoError::channel("Discord send response had no id"))?;
        Ok(MessageId(id.to_string()))
    }
}
