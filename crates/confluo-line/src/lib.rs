// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LINE channel adapter for Confluo.
//!
//! LINE is push-based: inbound messages arrive on the webhook and are
//! normalized by [`webhook::parse_webhook`]. Outbound messages use the push
//! API, so replies do not depend on an unexpired reply token.

pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use confluo_config::model::LineConfig;
use confluo_core::{
    AdapterType, ChannelAdapter, ChannelType, ConfluoError, HealthStatus, Message, MessageId,
    OutboundMessage, PluginAdapter,
};
use serde::Deserialize;
use tracing::{debug, info};

pub use webhook::{parse_webhook, verify_signature};

/// LINE channel adapter implementing [`ChannelAdapter`].
#[derive(Debug, Clone)]
pub struct LineChannel {
    client: reqwest::Client,
    access_token: String,
    api_base: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushResponse {
    #[serde(default)]
    sent_messages: Vec<SentMessage>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl LineChannel {
    /// Creates a new LINE channel adapter.
    ///
    /// Requires `config.channel_access_token` to be set.
    pub fn new(config: &LineConfig) -> Result<Self, ConfluoError> {
        let token = config
            .channel_access_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ConfluoError::Config("line.channel_access_token is required for LINE adapter".into())
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfluoError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        info!("LINE channel initialized");
        Ok(Self {
            client,
            access_token: token.to_string(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.api_base)
    }
}

#[async_trait]
impl PluginAdapter for LineChannel {
    fn name(&self) -> &str {
        "line"
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
            .get(self.url("/v2/bot/info"))
            .bearer_auth(&self.access_token)
            .send()
            .await;
        match response {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) if r.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => Ok(
                HealthStatus::Degraded("LINE is rate limiting requests".into()),
            ),
            Ok(r) => Ok(HealthStatus::Unhealthy(format!(
                "LINE bot info returned {}",
                r.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("LINE unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl ChannelAdapter for LineChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Line
    }

    /// LINE has no history API for bots; messages only arrive by webhook.
    async fn fetch_recent(&self) -> Result<Vec<Message>, ConfluoError> {
        Ok(Vec::new())
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ConfluoError> {
        let body = serde_json::json!({
            "to": msg.to,
            "messages": [{ "type": "text", "text": msg.content }],
        });

        let response = self
            .client
            .post(self.url("/v2/bot/message/push"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConfluoError::Channel {
                message: format!("LINE push request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        let request_id = response
            .headers()
            .get("x-line-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ConfluoError::channel(format!(
                "LINE push returned {status}: {text}"
            )));
        }
        debug!(to = %msg.to, "LINE push accepted");

        let sent = serde_json::from_str::<PushResponse>(&text)
            .ok()
            .and_then(|r| r.sent_messages.into_iter().next())
            .map(|m| m.id);
        sent.or(request_id).map(MessageId).ok_or_else(|| {
            ConfluoError::channel("LINE push accepted but returned no message or request id")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_access_token() {
        let err = LineChannel::new(&LineConfig::default()).unwrap_err();
        assert!(err.to_string().contains("line.channel_access_token"));

        let config = LineConfig {
            channel_access_token: Some(String::new()),
            ..LineConfig::default()
        };
        assert!(LineChannel::new(&config).is_err());
    }

    #[test]
    fn api_base_trailing_slash_is_trimmed() {
        let config = LineConfig {
            channel_access_token: Some("t".into()),
            api_base: "http://localhost:9/".into(),
            ..LineConfig::default()
        };
        let channel = LineChannel::new(&config).unwrap();
        assert_eq!(channel.url("/v2/bot/info"), "http://localhost:9/v2/bot/info");
    }

    #[tokio::test]
    async fn fetch_recent_is_empty() {
        let config = LineConfig {
            channel_access_token: Some("t".into()),
            ..LineConfig::default()
        };
        let channel = LineChannel::new(&config).unwrap();
        assert!(channel.fetch_recent().await.unwrap().is_empty());
        assert_eq!(channel.channel_type(), ChannelType::Line);
    }
}
