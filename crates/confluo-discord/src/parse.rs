// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Discord message objects and their normalization.

use chrono::{DateTime, Utc};
use confluo_core::{ChannelType, ConfluoError, Message};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct DiscordMessage {
    id: String,
    channel_id: String,
    author: Author,
    #[serde(default)]
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default)]
    attachments: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct Author {
    id: String,
    username: Option<String>,
}

/// Normalize one message object from `GET /channels/{id}/messages`.
///
/// Discord has no read state for bots, so everything fetched is unread.
/// Attachment-only messages are rendered as `[attachment]`.
pub fn to_message(raw: serde_json::Value) -> Result<Message, ConfluoError> {
    let parsed: DiscordMessage =
        serde_json::from_value(raw.clone()).map_err(|e| ConfluoError::Channel {
            message: format!("unexpected Discord message shape: {e}"),
            source: Some(Box::new(e)),
        })?;

    let content = if parsed.content.is_empty() && !parsed.attachments.is_empty() {
        "[attachment]".to_string()
    } else {
        parsed.content
    };

    Ok(Message {
        id: parsed.id,
        from: parsed.author.username.unwrap_or(parsed.author.id),
        to: parsed.channel_id,
        content,
        timestamp: parsed.timestamp,
        is_unread: true,
        channel: ChannelType::Discord,
        raw,
    })
}

/// Discord snowflakes are numeric; reject anything else before building a URL.
pub fn is_channel_id(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
