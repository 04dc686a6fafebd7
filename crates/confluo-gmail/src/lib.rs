// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gmail channel adapter for Confluo.
//!
//! Pull-based: [`GmailChannel::fetch_recent`] lists messages matching the
//! configured query and fetches each in full. Authentication uses a
//! pre-issued OAuth2 access token; refreshing it is the operator's job.

pub mod parse;

use std::time::Duration;

use async_trait::async_trait;
use confluo_config::model::GmailConfig;
use confluo_core::{
    AdapterType, ChannelAdapter, ChannelType, ConfluoError, HealthStatus, Message, MessageId,
    OutboundMessage, PluginAdapter,
};
use futures::future::try_join_all;
use lettre::message::Mailbox;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::parse::ListResponse;

/// Gmail channel adapter implementing [`ChannelAdapter`].
#[derive(Debug, Clone)]
pub struct GmailChannel {
    client: reqwest::Client,
    access_token: String,
    config: GmailConfig,
    sender: OnceCell<Mailbox>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    id: String,
}

/// `users.getProfile` response (fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    email_address: String,
}

impl GmailChannel {
    /// Creates a new Gmail channel adapter.
    ///
    /// Requires `config.access_token` to be set. A configured
    /// `from_address` must be a valid mailbox.
    pub fn new(config: GmailConfig) -> Result<Self, ConfluoError> {
        let token = config
            .access_token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                ConfluoError::Config("gmail.access_token is required for Gmail adapter".into())
            })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ConfluoError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        let sender = match config.from_address.as_deref().filter(|a| !a.is_empty()) {
            Some(address) => OnceCell::new_with(Some(parse::parse_mailbox(address)?)),
            None => OnceCell::new(),
        };

        info!(user_id = %config.user_id, query = %config.query, "Gmail channel initialized");
        Ok(Self {
            client,
            access_token: token,
            config,
            sender,
        })
    }

    fn users_url(&self, rest: &str) -> String {
        format!(
            "{}/gmail/v1/users/{}{rest}",
            self.config.api_base.trim_end_matches('/'),
            self.config.user_id
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ConfluoError> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| ConfluoError::Channel {
                message: format!("Gmail request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfluoError::channel(format!("Gmail returned {status}: {body}")));
        }
        response.json::<T>().await.map_err(|e| ConfluoError::Channel {
            message: format!("failed to decode Gmail response: {e}"),
            source: Some(Box::new(e)),
        })
    }

    /// The From mailbox for outbound mail, looked up once from the profile.
    async fn sender(&self) -> Result<&Mailbox, ConfluoError> {
        self.sender
            .get_or_try_init(|| async {
                let url = parse_url(&self.users_url("/profile"), &[])?;
                let profile: Profile = self.get_json(url).await?;
                debug!(address = %profile.email_address, "Gmail sender resolved from profile");
                parse::parse_mailbox(&profile.email_address)
            })
            .await
    }

    async fn get_message(&self, id: &str) -> Result<Message, ConfluoError> {
        let url = parse_url(
            &self.users_url(&format!("/messages/{id}")),
            &[("format", "full")],
        )?;
        let raw: serde_json::Value = self.get_json(url).await?;
        parse::to_message(raw)
    }
}

fn parse_url(base: &str, params: &[(&str, &str)]) -> Result<Url, ConfluoError> {
    Url::parse_with_params(base, params)
        .map_err(|e| ConfluoError::Config(format!("invalid Gmail URL {base}: {e}")))
}

#[async_trait]
impl PluginAdapter for GmailChannel {
    fn name(&self) -> &str {
        "gmail"
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
            .get(self.users_url("/profile"))
            .bearer_auth(&self.access_token)
            .send()
            .await;
        match response {
            Ok(r) if r.status().is_success() => Ok(HealthStatus::Healthy),
            Ok(r) if r.status() == StatusCode::TOO_MANY_REQUESTS => Ok(HealthStatus::Degraded(
                "Gmail is rate limiting requests".into(),
            )),
            Ok(r) => Ok(HealthStatus::Unhealthy(format!(
                "Gmail profile returned {}",
                r.status()
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(format!("Gmail unreachable: {e}"))),
        }
    }
}

#[async_trait]
impl ChannelAdapter for GmailChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Gmail
    }

    async fn fetch_recent(&self) -> Result<Vec<Message>, ConfluoError> {
        let max_results = self.config.max_results.to_string();
        let url = parse_url(
            &self.users_url("/messages"),
            &[("q", self.config.query.as_str()), ("maxResults", max_results.as_str())],
        )?;
        let list: ListResponse = self.get_json(url).await?;
        debug!(count = list.messages.len(), "Gmail list returned");

        try_join_all(list.messages.iter().map(|m| self.get_message(&m.id))).await
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ConfluoError> {
        let from = self.sender().await?;
        let raw = parse::encode_outbound(&msg, from)?;
        let response = self
            .client
            .post(self.users_url("/messages/send"))
            .bearer_auth(&self.access_token)
            .json(&serde_json::json!({ "raw": raw }))
            .send()
            .await
            .map_err(|e| ConfluoError::Channel {
                message: format!("Gmail send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConfluoError::channel(format!(
                "Gmail send returned {status}: {body}"
            )));
        }
        let sent: SendResponse = response.json().await.map_err(|e| ConfluoError::Channel {
            message: format!("failed to decode Gmail send response: {e}"),
            source: Some(Box::new(e)),
        })?;
        debug!(id = %sent.id, "Gmail message sent");
        Ok(MessageId(sent.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_requires_access_token() {
        let err = GmailChannel::new(GmailConfig::default()).unwrap_err();
        assert!(err.to_string().contains("gmail.access_token"));
    }

    #[test]
    fn new_rejects_malformed_from_address() {
        let err = GmailChannel::new(GmailConfig {
            access_token: Some("t".into()),
            from_address: Some("me at example".into()),
            ..GmailConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, ConfluoError::Validation(_)));
    }

    #[test]
    fn list_url_encodes_query() {
        let channel = GmailChannel::new(GmailConfig {
            access_token: Some("t".into()),
            ..GmailConfig::default()
        })
        .unwrap();
        let url = parse_url(
            &channel.users_url("/messages"),
            &[("q", "is:unread in:inbox"), ("maxResults", "20")],
        )
        .unwrap();
        assert_eq!(url.path(), "/gmail/v1/users/me/messages");
        assert_eq!(url.query(), Some("q=is%3Aunread+in%3Ainbox&maxResults=20"));
    }
}
