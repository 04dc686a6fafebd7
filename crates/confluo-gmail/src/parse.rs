// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gmail API message resources and their normalization.

use base64::Engine;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use chrono::{DateTime, TimeZone, Utc};
use confluo_core::{ChannelType, ConfluoError, Message, OutboundMessage};
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use serde::Deserialize;

/// `users.messages.list` response.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse {
    #[serde(default)]
    pub messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub id: String,
}

/// `users.messages.get?format=full` response (fields we use).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GmailMessage {
    pub id: String,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub snippet: String,
    /// Milliseconds since the epoch, as a decimal string.
    pub internal_date: Option<String>,
    pub payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub headers: Vec<Header>,
    pub body: Option<PartBody>,
    #[serde(default)]
    pub parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub struct PartBody {
    pub data: Option<String>,
}

impl GmailMessage {
    fn header(&self, name: &str) -> Option<&str> {
        self.payload
            .as_ref()?
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.internal_date
            .as_deref()
            .and_then(|ms| ms.parse::<i64>().ok())
            .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
            .unwrap_or_else(Utc::now)
    }

    fn text_body(&self) -> Option<String> {
        self.payload.as_ref().and_then(find_text_plain)
    }
}

/// Depth-first search for the first `text/plain` part with data.
fn find_text_plain(part: &MessagePart) -> Option<String> {
    if part.mime_type.eq_ignore_ascii_case("text/plain") {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            return decode_base64url(data);
        }
    }
    part.parts.iter().find_map(find_text_plain)
}

/// Gmail emits base64url, usually padded; accept both.
fn decode_base64url(data: &str) -> Option<String> {
    let bytes = URL_SAFE
        .decode(data)
        .or_else(|_| URL_SAFE_NO_PAD.decode(data.trim_end_matches('=')))
        .ok()?;
    Some(String::from_utf8_lossy(&bytes).into_owned())
}

/// Normalize a full Gmail message resource.
///
/// The body is the first `text/plain` part, falling back to the snippet for
/// HTML-only mail.
pub fn to_message(raw: serde_json::Value) -> Result<Message, ConfluoError> {
    let parsed: GmailMessage = serde_json::from_value(raw.clone()).map_err(|e| ConfluoError::Channel {
        message: format!("unexpected Gmail message shape: {e}"),
        source: Some(Box::new(e)),
    })?;

    let content = parsed
        .text_body()
        .map(|body| body.trim_end().to_string())
        .unwrap_or_else(|| parsed.snippet.clone());

    Ok(Message {
        id: parsed.id.clone(),
        from: parsed.header("From").unwrap_or_default().to_string(),
        to: parsed.header("To").unwrap_or_default().to_string(),
        content,
        timestamp: parsed.timestamp(),
        is_unread: parsed.label_ids.iter().any(|l| l == "UNREAD"),
        channel: ChannelType::Gmail,
        raw,
    })
}

/// Parse an RFC 5322 mailbox such as `Bob <bob@example.com>`.
pub fn parse_mailbox(address: &str) -> Result<Mailbox, ConfluoError> {
    address
        .parse::<Mailbox>()
        .map_err(|e| ConfluoError::Validation(format!("invalid email address {address:?}: {e}")))
}

/// Build the base64url-encoded RFC 5322 message for `users.messages.send`.
///
/// Non-ASCII headers are RFC 2047 encoded and the body transfer encoding is
/// picked from its content.
pub fn encode_outbound(msg: &OutboundMessage, from: &Mailbox) -> Result<String, ConfluoError> {
    let subject = msg.subject.as_deref().unwrap_or("");
    if subject.contains(['\r', '\n']) {
        return Err(ConfluoError::Validation(
            "email subject must not contain line breaks".into(),
        ));
    }

    let email = lettre::Message::builder()
        .from(from.clone())
        .to(parse_mailbox(&msg.to)?)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(msg.content.clone())
        .map_err(|e| ConfluoError::Validation(format!("cannot build email: {e}")))?;
    Ok(URL_SAFE.encode(email.formatted()))
}
