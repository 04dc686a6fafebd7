// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging provider integrations (LINE, Gmail, Discord).

use async_trait::async_trait;

use crate::error::ConfluoError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelType, Message, MessageId, OutboundMessage};

/// Adapter for one messaging provider.
///
/// Adapters normalize provider payloads into [`Message`] and deliver
/// outbound text. They never touch the message cache themselves; callers
/// decide where normalized messages go.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// The channel this adapter serves.
    fn channel_type(&self) -> ChannelType;

    /// Pulls recent messages from the provider.
    ///
    /// Push-based channels (LINE webhooks) return an empty list.
    async fn fetch_recent(&self) -> Result<Vec<Message>, ConfluoError>;

    /// Sends a message through the channel.
    async fn send(&self, msg: OutboundMessage) -> Result<MessageId, ConfluoError>;
}
