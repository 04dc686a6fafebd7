// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reply drafting for cached messages.

use async_trait::async_trait;
use confluo_config::model::AnthropicConfig;
use confluo_core::{AdapterType, ConfluoError, HealthStatus, Message, PluginAdapter};
use tracing::{debug, info};

use crate::client::AnthropicClient;
use crate::types::{ApiMessage, MessageRequest};

const SYSTEM_PROMPT: &str = "You draft replies to messages a user received. \
Write the reply in the same language as the original message. \
Keep it short and natural for the channel it arrived on. \
Return only the reply text, without a greeting line about being an assistant.";

/// Drafts replies to cached messages with Claude.
#[derive(Debug, Clone)]
pub struct ReplyDrafter {
    client: AnthropicClient,
    max_tokens: u32,
}

impl ReplyDrafter {
    /// Build a drafter from the `[anthropic]` config section.
    ///
    /// # API Key Resolution
    /// 1. `anthropic.api_key` if set and non-empty
    /// 2. `ANTHROPIC_API_KEY` environment variable
    /// 3. Returns a config error if neither is available
    pub fn from_config(config: &AnthropicConfig) -> Result<Self, ConfluoError> {
        let api_key = resolve_api_key(config.api_key.as_deref())?;
        let client = AnthropicClient::new(
            api_key,
            config.api_version.clone(),
            config.model.clone(),
        )?
        .with_base_url(&config.api_base);

        info!(model = %config.model, "reply drafter initialized");
        Ok(Self::with_client(client, config.max_tokens))
    }

    pub fn with_client(client: AnthropicClient, max_tokens: u32) -> Self {
        Self { client, max_tokens }
    }

    /// Draft a reply to `message`, optionally steered by `instructions`.
    pub async fn draft(
        &self,
        message: &Message,
        instructions: Option<&str>,
    ) -> Result<String, ConfluoError> {
        let request = self.build_request(message, instructions);
        debug!(channel = %message.channel, id = %message.id, "drafting reply");

        let response = self.client.complete_message(&request).await?;
        response
            .first_text()
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| ConfluoError::provider("completion contained no text"))
    }

    fn build_request(&self, message: &Message, instructions: Option<&str>) -> MessageRequest {
        let mut prompt = format!(
            "Channel: {}\nFrom: {}\n\n{}",
            message.channel, message.from, message.content
        );
        if let Some(extra) = instructions.map(str::trim).filter(|s| !s.is_empty()) {
            prompt.push_str("\n\nAdditional instructions: ");
            prompt.push_str(extra);
        }

        MessageRequest {
            model: self.client.default_model().to_string(),
            messages: vec![ApiMessage::user(prompt)],
            system: Some(SYSTEM_PROMPT.to_string()),
            max_tokens: self.max_tokens,
        }
    }
}

#[async_trait]
impl PluginAdapter for ReplyDrafter {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Provider
    }

    async fn health_check(&self) -> Result<HealthStatus, ConfluoError> {
        // Probing the API would spend tokens; reachability shows up in the breaker.
        Ok(HealthStatus::Healthy)
    }
}

fn resolve_api_key(config_key: Option<&str>) -> Result<String, ConfluoError> {
    if let Some(key) = config_key.filter(|k| !k.is_empty()) {
        return Ok(key.to_string());
    }

    std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
        ConfluoError::Config(
            "Anthropic API key not found. Set anthropic.api_key in config or ANTHROPIC_API_KEY environment variable.".into(),
        )
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use confluo_core::ChannelType;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn message() -> Message {
        Message {
            id: "U123-1".into(),
            from: "U123".into(),
            to: "me".into(),
            content: "明日の会議は何時ですか？".into(),
            timestamp: Utc::now(),
            is_unread: true,
            channel: ChannelType::Line,
            raw: serde_json::Value::Null,
        }
    }

    fn drafter(base: &str) -> ReplyDrafter {
        let client = AnthropicClient::new("k".into(), "2023-06-01".into(), "claude-test".into())
            .unwrap()
            .with_base_url(base);
        ReplyDrafter::with_client(client, 256)
    }

    #[test]
    fn resolve_api_key_prefers_config() {
        assert_eq!(resolve_api_key(Some("sk-test-123")).unwrap(), "sk-test-123");
    }

    #[test]
    fn resolve_api_key_empty_config_falls_back_to_env() {
        // Succeeds only when ANTHROPIC_API_KEY is set; never yields an empty key.
        match resolve_api_key(Some("")) {
            Ok(key) => assert!(!key.is_empty()),
            Err(e) => assert!(e.to_string().contains("API key not found")),
        }
    }

    #[test]
    fn request_includes_message_and_instructions() {
        let d = drafter("http://unused");
        let req = d.build_request(&message(), Some("  decline politely "));
        assert_eq!(req.model, "claude-test");
        assert_eq!(req.max_tokens, 256);
        assert!(req.system.as_deref().unwrap().contains("same language"));
        let content = &req.messages[0].content;
        assert!(content.starts_with("Channel: line\nFrom: U123"));
        assert!(content.contains("明日の会議"));
        assert!(content.ends_with("Additional instructions: decline politely"));
    }

    #[test]
    fn blank_instructions_are_ignored() {
        let d = drafter("http://unused");
        let req = d.build_request(&message(), Some("   "));
        assert!(!req.messages[0].content.contains("Additional instructions"));
    }

    #[tokio::test]
    async fn draft_returns_trimmed_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(body_partial_json(serde_json::json!({"model": "claude-test"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_1",
                "content": [{"type": "text", "text": "  15時からです。\n"}],
                "model": "claude-test",
                "stop_reason": "end_turn",
                "usage": {"input_tokens": 30, "output_tokens": 6}
            })))
            .mount(&server)
            .await;

        let reply = drafter(&server.uri()).draft(&message(), None).await.unwrap();
        assert_eq!(reply, "15時からです。");
    }

    #[tokio::test]
    async fn draft_without_text_is_provider_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg_2",
                "content": [],
                "model": "claude-test",
                "stop_reason": "max_tokens"
            })))
            .mount(&server)
            .await;

        let err = drafter(&server.uri()).draft(&message(), None).await.unwrap_err();
        assert!(matches!(err, ConfluoError::Provider { .. }));
    }
}
