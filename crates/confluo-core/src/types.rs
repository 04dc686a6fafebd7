// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the cache, channel adapters and the gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Provider-assigned message identifier, unique within its channel only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

/// Health status reported by adapter health checks.
///
/// Serializes as `{"status": "degraded", "reason": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter answers but is throttling us.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }
}

/// Identifies the kind of adapter.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Channel,
    Provider,
}

/// The messaging providers Confluo aggregates.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    Discord,
    Gmail,
    Line,
}

impl ChannelType {
    /// Every supported channel, in a stable order.
    pub const ALL: [ChannelType; 3] = [ChannelType::Discord, ChannelType::Gmail, ChannelType::Line];
}

/// One normalized inbound or outbound communication unit.
///
/// `from`/`to` are channel-specific identifiers (user ids, email addresses,
/// group ids) and are never validated here. `raw` keeps the provider payload
/// for debugging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub from: String,
    pub to: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    pub is_unread: bool,
    pub channel: ChannelType,
    #[serde(default)]
    pub raw: serde_json::Value,
}

/// A message to deliver through a channel adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Channel-specific recipient (LINE user/group id, email address, Discord channel id).
    pub to: String,
    /// Plain text body.
    pub content: String,
    /// Optional subject line. Only meaningful for email.
    #[serde(default)]
    pub subject: Option<String>,
}
