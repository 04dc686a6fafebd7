// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Confluo.
//!
//! This crate provides the normalized [`Message`] model, the error type, and
//! the adapter traits implemented by every channel integration.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::ConfluoError;
pub use traits::{ChannelAdapter, PluginAdapter};
pub use types::{
    AdapterType, ChannelType, HealthStatus, Message, MessageId, OutboundMessage,
};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn sample() -> Message {
        Message {
            id: "m-1".into(),
            from: "alice".into(),
            to: "bob".into(),
            content: "hello".into(),
            timestamp: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
            is_unread: true,
            channel: ChannelType::Line,
            raw: serde_json::json!({"type": "message"}),
        }
    }

    #[test]
    fn health_status_serializes_with_reason() {
        let healthy = serde_json::to_value(HealthStatus::Healthy).unwrap();
        assert_eq!(healthy, serde_json::json!({"status": "healthy"}));
        let degraded = serde_json::to_value(HealthStatus::Degraded("rate limited".into())).unwrap();
        assert_eq!(
            degraded,
            serde_json::json!({"status": "degraded", "reason": "rate limited"})
        );
        assert!(!HealthStatus::Unhealthy("down".into()).is_healthy());
    }

    #[test]
    fn message_serializes_with_camel_case_fields() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["isUnread"], true);
        assert_eq!(json["channel"], "line");
        assert_eq!(json["timestamp"], "2026-03-01T12:00:00Z");
        assert!(json.get("is_unread").is_none());
    }

    #[test]
    fn message_deserializes_without_raw() {
        let json = r#"{
            "id": "1",
            "from": "a",
            "to": "b",
            "content": "hi",
            "timestamp": "2026-03-01T12:00:00Z",
            "isUnread": false,
            "channel": "gmail"
        }"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.channel, ChannelType::Gmail);
        assert!(msg.raw.is_null());
    }

    #[test]
    fn channel_type_parses_case_insensitively() {
        assert_eq!(ChannelType::from_str("discord").unwrap(), ChannelType::Discord);
        assert_eq!(ChannelType::from_str("LINE").unwrap(), ChannelType::Line);
        assert!(ChannelType::from_str("telegram").is_err());
    }

    #[test]
    fn channel_type_display_matches_wire_name() {
        for channel in ChannelType::ALL {
            let wire = serde_json::to_value(channel).unwrap();
            assert_eq!(wire, channel.to_string());
        }
    }

    #[test]
    fn error_messages_name_the_failure() {
        let open = ConfluoError::CircuitOpen {
            dependency: "gmail".into(),
        };
        assert_eq!(open.to_string(), "circuit open for gmail");

        let timeout = ConfluoError::Timeout {
            duration: std::time::Duration::from_millis(10),
        };
        assert!(timeout.to_string().contains("10ms"));

        assert!(ConfluoError::channel("boom").to_string().contains("boom"));
    }

    #[test]
    fn all_trait_modules_are_exported() {
        fn _assert_plugin_adapter<T: PluginAdapter>() {}
        fn _assert_channel_adapter<T: ChannelAdapter>() {}
    }
}
