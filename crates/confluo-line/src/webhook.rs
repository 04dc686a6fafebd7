// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! LINE webhook signature verification and event normalization.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, TimeZone, Utc};
use confluo_core::{ChannelType, ConfluoError, Message};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Verify the `X-Line-Signature` header against the raw request body.
///
/// The signature is the base64-encoded HMAC-SHA256 of the body keyed with
/// the channel secret. Comparison is constant-time.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        warn!("LINE signature header is not valid base64");
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Deserialize)]
struct WebhookBody {
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    timestamp: i64,
    source: EventSource,
    message: Option<EventMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventSource {
    user_id: Option<String>,
    group_id: Option<String>,
    room_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EventMessage {
    id: String,
    #[serde(rename = "type")]
    message_type: String,
    text: Option<String>,
}

/// Normalize a webhook body into cacheable messages.
///
/// Only `message` events become messages; follows, joins, postbacks and the
/// like are skipped. Non-text messages are rendered as `[type]`. A body that
/// is not a webhook payload at all is a validation error, but a single
/// malformed event is logged and skipped.
pub fn parse_webhook(body: &[u8]) -> Result<Vec<Message>, ConfluoError> {
    let parsed: WebhookBody = serde_json::from_slice(body)
        .map_err(|e| ConfluoError::Validation(format!("invalid LINE webhook body: {e}")))?;

    let mut messages = Vec::with_capacity(parsed.events.len());
    for raw in parsed.events {
        let event: WebhookEvent = match serde_json::from_value(raw.clone()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "skipping malformed LINE event");
                continue;
            }
        };
        if event.event_type != "message" {
            debug!(event_type = %event.event_type, "ignoring non-message LINE event");
            continue;
        }
        let Some(body) = event.message else {
            continue;
        };

        let content = match (body.message_type.as_str(), body.text) {
            ("text", Some(text)) => text,
            (kind, _) => format!("[{kind}]"),
        };
        let source = event.source;
        let from = source.user_id.clone().unwrap_or_else(|| "unknown".to_string());
        let to = source
            .group_id
            .or(source.room_id)
            .or(source.user_id)
            .unwrap_or_default();

        messages.push(Message {
            id: body.id,
            from,
            to,
            content,
            timestamp: millis_to_datetime(event.timestamp),
            is_unread: true,
            channel: ChannelType::Line,
            raw,
        });
    }
    Ok(messages)
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        STANDARD.encode(mac.finalize().into_bytes())
    }

    const BODY: &str = r#"{
        "destination": "Uxxxxxxxx",
        "events": [
            {
                "type": "message",
                "timestamp": 1700000000000,
                "source": {"type": "user", "userId": "U1"},
                "replyToken": "r1",
                "message": {"id": "100", "type": "text", "text": "hello"}
            },
            {
                "type": "message",
                "timestamp": 1700000001000,
                "source": {"type": "group", "groupId": "G1", "userId": "U2"},
                "message": {"id": "101", "type": "sticker", "packageId": "1", "stickerId": "2"}
            },
            {
                "type": "follow",
                "timestamp": 1700000002000,
                "source": {"type": "user", "userId": "U3"}
            }
        ]
    }"#;

    #[test]
    fn valid_signature_verifies() {
        let sig = sign("secret", BODY.as_bytes());
        assert!(verify_signature("secret", BODY.as_bytes(), &sig));
    }

    #[test]
    fn tampered_body_fails_verification() {
        let sig = sign("secret", BODY.as_bytes());
        assert!(!verify_signature("secret", b"{}", &sig));
        assert!(!verify_signature("other", BODY.as_bytes(), &sig));
    }

    #[test]
    fn garbage_signature_fails_verification() {
        assert!(!verify_signature("secret", BODY.as_bytes(), "not base64!!"));
        assert!(!verify_signature("secret", BODY.as_bytes(), ""));
    }

    #[test]
    fn parses_message_events_only() {
        let messages = parse_webhook(BODY.as_bytes()).unwrap();
        assert_eq!(messages.len(), 2);

        let text = &messages[0];
        assert_eq!(text.id, "100");
        assert_eq!(text.from, "U1");
        assert_eq!(text.to, "U1");
        assert_eq!(text.content, "hello");
        assert_eq!(text.channel, ChannelType::Line);
        assert!(text.is_unread);
        assert_eq!(text.timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(text.raw["replyToken"], "r1");

        let sticker = &messages[1];
        assert_eq!(sticker.content, "[sticker]");
        assert_eq!(sticker.from, "U2");
        assert_eq!(sticker.to, "G1");
    }

    #[test]
    fn empty_events_is_ok() {
        let messages = parse_webhook(br#"{"destination":"U","events":[]}"#).unwrap();
        assert!(messages.is_empty());
    }

    #[test]
    fn malformed_event_is_skipped() {
        let body = br#"{"events":[{"type":"message"},{"type":"message","timestamp":1,"source":{"userId":"U"},"message":{"id":"1","type":"text","text":"ok"}}]}"#;
        let messages = parse_webhook(body).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "ok");
    }

    #[test]
    fn non_json_body_is_validation_error() {
        let err = parse_webhook(b"not json").unwrap_err();
        assert!(matches!(err, ConfluoError::Validation(_)));
    }
}
