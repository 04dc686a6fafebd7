// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Builders for test messages.

use chrono::{DateTime, TimeZone, Utc};
use confluo_core::{ChannelType, Message};

/// Fluent builder for [`Message`] with sensible test defaults.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    message: Message,
}

impl MessageBuilder {
    pub fn new(channel: ChannelType, id: impl Into<String>) -> Self {
        Self {
            message: Message {
                id: id.into(),
                from: "sender".to_string(),
                to: "recipient".to_string(),
                content: String::new(),
                timestamp: Utc::now(),
                is_unread: true,
                channel,
                raw: serde_json::Value::Null,
            },
        }
    }

    pub fn from(mut self, from: impl Into<String>) -> Self {
        self.message.from = from.into();
        self
    }

    pub fn to(mut self, to: impl Into<String>) -> Self {
        self.message.to = to.into();
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.message.content = content.into();
        self
    }

    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.message.timestamp = timestamp;
        self
    }

    /// Timestamp as whole seconds since the epoch.
    pub fn at_secs(self, secs: i64) -> Self {
        let ts = Utc.timestamp_opt(secs, 0).single().unwrap_or_else(Utc::now);
        self.timestamp(ts)
    }

    pub fn read(mut self) -> Self {
        self.message.is_unread = false;
        self
    }

    pub fn raw(mut self, raw: serde_json::Value) -> Self {
        self.message.raw = raw;
        self
    }

    pub fn build(self) -> Message {
        self.message
    }
}

/// Shorthand for a message on `channel` with `id` at `secs` past the epoch.
pub fn message_at(channel: ChannelType, id: &str, secs: i64) -> Message {
    MessageBuilder::new(channel, id)
        .content(format!("message {id}"))
        .at_secs(secs)
        .build()
}
