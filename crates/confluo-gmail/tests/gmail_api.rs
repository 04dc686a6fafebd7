// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gmail adapter against a mocked Gmail API.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use confluo_config::model::GmailConfig;
use confluo_core::{
    ChannelAdapter, ChannelType, ConfluoError, HealthStatus, OutboundMessage, PluginAdapter,
};
use confluo_gmail::GmailChannel;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn channel(server: &MockServer) -> GmailChannel {
    GmailChannel::new(GmailConfig {
        access_token: Some("ya29.test".into()),
        api_base: server.uri(),
        ..GmailConfig::default()
    })
    .unwrap()
}

fn full_message(id: &str, body: &str, millis: i64) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "labelIds": ["INBOX", "UNREAD"],
        "snippet": body,
        "internalDate": millis.to_string(),
        "payload": {
            "mimeType": "text/plain",
            "headers": [
                {"name": "From", "value": "carol@example.com"},
                {"name": "To", "value": "me@example.com"}
            ],
            "body": {"data": URL_SAFE.encode(body)}
        }
    })
}

#[tokio::test]
async fn fetch_recent_lists_then_gets_each_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .and(query_param("q", "is:unread in:inbox"))
        .and(query_param("maxResults", "20"))
        .and(header("authorization", "Bearer ya29.test"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "messages": [{"id": "a", "threadId": "t"}, {"id": "b", "threadId": "t"}],
            "resultSizeEstimate": 2
        })))
        .expect(1)
        .mount(&server)
        .await;
    for (id, body, ms) in [("a", "first", 1_700_000_000_000_i64), ("b", "second", 1_700_000_100_000)] {
        Mock::given(method("GET"))
            .and(path(format!("/gmail/v1/users/me/messages/{id}")))
            .and(query_param("format", "full"))
            .respond_with(ResponseTemplate::new(200).set_body_json(full_message(id, body, ms)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let messages = channel(&server).fetch_recent().await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].id, "a");
    assert_eq!(messages[0].content, "first");
    assert_eq!(messages[1].from, "carol@example.com");
    assert!(messages.iter().all(|m| m.channel == ChannelType::Gmail && m.is_unread));
}

#[tokio::test]
async fn fetch_recent_with_empty_inbox() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/messages"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"resultSizeEstimate": 0})),
        )
        .mount(&server)
        .await;

    assert!(channel(&server).fetch_recent().await.unwrap().is_empty());
}

#[tokio::test]
async fn expired_token_is_channel_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": {"code": 401, "message": "Request had invalid authentication credentials."}
        })))
        .mount(&server)
        .await;

    let err = channel(&server).fetch_recent().await.unwrap_err();
    assert!(matches!(err, ConfluoError::Channel { .. }));
    assert!(err.to_string().contains("401"));
}

fn mime_headers(mime: &str) -> Vec<&str> {
    mime.split("\r\n\r\n").next().unwrap().lines().collect()
}

#[tokio::test]
async fn send_resolves_sender_from_profile_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/profile"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"emailAddress": "me@example.com"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let raw = body["raw"].as_str().unwrap();
            let mime = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();
            let headers = mime_headers(&mime);
            if headers.contains(&"From: me@example.com")
                && headers.contains(&"To: dave@example.com")
                && mime.contains("\r\n\r\nThanks!")
            {
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "sent-1", "threadId": "t1"}))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(2)
        .mount(&server)
        .await;

    let gmail = channel(&server);
    for _ in 0..2 {
        let id = gmail
            .send(OutboundMessage {
                to: "dave@example.com".into(),
                content: "Thanks!".into(),
                subject: Some("Re: hello".into()),
            })
            .await
            .unwrap();
        assert_eq!(id.0, "sent-1");
    }
}

#[tokio::test]
async fn configured_sender_skips_profile_lookup() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/profile"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(|req: &Request| {
            let body: serde_json::Value = serde_json::from_slice(&req.body).unwrap();
            let raw = body["raw"].as_str().unwrap();
            let mime = String::from_utf8(URL_SAFE.decode(raw).unwrap()).unwrap();
            if mime_headers(&mime).contains(&"From: Support <support@example.com>") {
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "sent-2"}))
            } else {
                ResponseTemplate::new(400)
            }
        })
        .expect(1)
        .mount(&server)
        .await;

    let gmail = GmailChannel::new(GmailConfig {
        access_token: Some("ya29.test".into()),
        api_base: server.uri(),
        from_address: Some("Support <support@example.com>".into()),
        ..GmailConfig::default()
    })
    .unwrap();
    let id = gmail
        .send(OutboundMessage {
            to: "dave@example.com".into(),
            content: "On it.".into(),
            subject: None,
        })
        .await
        .unwrap();
    assert_eq!(id.0, "sent-2");
}

#[tokio::test]
async fn invalid_recipient_is_rejected_before_sending() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/gmail/v1/users/me/messages/send"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let gmail = GmailChannel::new(GmailConfig {
        access_token: Some("ya29.test".into()),
        api_base: server.uri(),
        from_address: Some("me@example.com".into()),
        ..GmailConfig::default()
    })
    .unwrap();
    let err = gmail
        .send(OutboundMessage {
            to: "not an address".into(),
            content: "hi".into(),
            subject: None,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ConfluoError::Validation(_)));
}

#[tokio::test]
async fn rate_limited_profile_is_degraded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/v1/users/me/profile"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;

    let status = channel(&server).health_check().await.unwrap();
    assert!(matches!(status, HealthStatus::Degraded(_)));
}
