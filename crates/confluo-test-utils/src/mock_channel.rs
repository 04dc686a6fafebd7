// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel adapter for deterministic testing.
//!
//! `MockChannel` implements `ChannelAdapter` with queued fetch results,
//! switchable failure modes and captured outbound messages for assertion.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use confluo_core::{
    AdapterType, ChannelAdapter, ChannelType, ConfluoError, HealthStatus, Message, MessageId,
    OutboundMessage, PluginAdapter,
};

/// How the mock answers `fetch_recent` and `send`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockMode {
    /// Calls succeed.
    Healthy,
    /// Calls return a channel error immediately.
    Failing,
    /// Calls never complete.
    Hanging,
}

/// A mock messaging channel for testing.
///
/// - **inbound**: messages queued via `push_inbound()` are drained by `fetch_recent()`
/// - **snapshot**: messages set via `set_snapshot()` are returned by every `fetch_recent()`,
///   the way pull APIs return the latest N messages on each call
/// - **sent**: messages passed to `send()` are captured and retrievable via `sent_messages()`
#[derive(Clone)]
pub struct MockChannel {
    channel: ChannelType,
    inbound: Arc<Mutex<Vec<Message>>>,
    snapshot: Arc<Mutex<Vec<Message>>>,
    sent: Arc<Mutex<Vec<OutboundMessage>>>,
    mode: Arc<std::sync::Mutex<MockMode>>,
    calls: Arc<AtomicUsize>,
}

impl MockChannel {
    /// Create a healthy mock for `channel` with empty queues.
    pub fn new(channel: ChannelType) -> Self {
        Self {
            channel,
            inbound: Arc::new(Mutex::new(Vec::new())),
            snapshot: Arc::new(Mutex::new(Vec::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            mode: Arc::new(std::sync::Mutex::new(MockMode::Healthy)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Queue messages for the next `fetch_recent()`.
    pub async fn push_inbound(&self, messages: impl IntoIterator<Item = Message>) {
        self.inbound.lock().await.extend(messages);
    }

    /// Replace the messages returned by every `fetch_recent()`.
    pub async fn set_snapshot(&self, messages: impl IntoIterator<Item = Message>) {
        *self.snapshot.lock().await = messages.into_iter().collect();
    }

    pub fn set_mode(&self, mode: MockMode) {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner()) = mode;
    }

    fn mode(&self) -> MockMode {
        *self.mode.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Number of `fetch_recent`/`send` invocations that reached the adapter.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Get all messages that were sent through `send()`.
    pub async fn sent_messages(&self) -> Vec<OutboundMessage> {
        self.sent.lock().await.clone()
    }

    async fn enter(&self) -> Result<(), ConfluoError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.mode() {
            MockMode::Healthy => Ok(()),
            MockMode::Failing => Err(ConfluoError::channel(format!(
                "{} mock is failing",
                self.channel
            ))),
            MockMode::Hanging => std::future::pending().await,
        }
    }
}

#[async_trait]
impl PluginAdapter for MockChannel {
    fn name(&self) -> &str {
        "mock-channel"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, ConfluoError> {
        Ok(match self.mode() {
            MockMode::Healthy => HealthStatus::Healthy,
            mode => HealthStatus::Unhealthy(format!("{mode:?}")),
        })
    }
}

#[async_trait]
impl ChannelAdapter for MockChannel {
    fn channel_type(&self) -> ChannelType {
        self.channel
    }

    async fn fetch_recent(&self) -> Result<Vec<Message>, ConfluoError> {
        self.enter().await?;
        let mut messages = self.snapshot.lock().await.clone();
        messages.append(&mut *self.inbound.lock().await);
        Ok(messages)
    }

    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ConfluoError> {
        self.enter().await?;
        let id = format!("mock-msg-{}", uuid::Uuid::new_v4());
        self.sent.lock().await.push(msg);
        Ok(MessageId(id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::builders::message_at;

    fn outbound(content: &str) -> OutboundMessage {
        OutboundMessage {
            to: "someone".to_string(),
            content: content.to_string(),
            subject: None,
        }
    }

    #[tokio::test]
    async fn fetch_recent_drains_queued_messages() {
        let channel = MockChannel::new(ChannelType::Gmail);
        channel
            .push_inbound([message_at(ChannelType::Gmail, "a", 1)])
            .await;

        let first = channel.fetch_recent().await.unwrap();
        assert_eq!(first.len(), 1);
        assert!(channel.fetch_recent().await.unwrap().is_empty());
        assert_eq!(channel.calls(), 2);
    }

    #[tokio::test]
    async fn snapshot_is_returned_on_every_fetch() {
        let channel = MockChannel::new(ChannelType::Discord);
        channel
            .set_snapshot([message_at(ChannelType::Discord, "d1", 1)])
            .await;
        channel
            .push_inbound([message_at(ChannelType::Discord, "d2", 2)])
            .await;

        assert_eq!(channel.fetch_recent().await.unwrap().len(), 2);
        let second = channel.fetch_recent().await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].id, "d1");
    }

    #[tokio::test]
    async fn send_captures_outbound_messages() {
        let channel = MockChannel::new(ChannelType::Line);
        let msg_id = channel.send(outbound("response text")).await.unwrap();
        assert!(msg_id.0.starts_with("mock-msg-"));

        let sent = channel.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].content, "response text");
    }

    #[tokio::test]
    async fn failing_mode_returns_channel_error() {
        let channel = MockChannel::new(ChannelType::Discord);
        channel.set_mode(MockMode::Failing);
        let err = channel.send(outbound("x")).await.unwrap_err();
        assert!(matches!(err, ConfluoError::Channel { .. }));
        assert!(channel.sent_messages().await.is_empty());
        assert!(matches!(
            channel.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_mode_never_completes() {
        let channel = MockChannel::new(ChannelType::Gmail);
        channel.set_mode(MockMode::Hanging);
        let result = tokio::time::timeout(Duration::from_secs(5), channel.fetch_recent()).await;
        assert!(result.is_err());
        assert_eq!(channel.calls(), 1);
    }

    #[tokio::test]
    async fn clones_share_state() {
        let channel = MockChannel::new(ChannelType::Line);
        let clone = channel.clone();
        clone.send(outbound("via clone")).await.unwrap();
        assert_eq!(channel.sent_messages().await.len(), 1);
        assert_eq!(channel.channel_type(), ChannelType::Line);
    }
}
