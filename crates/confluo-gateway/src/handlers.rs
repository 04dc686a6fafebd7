// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway.

use std::collections::BTreeMap;
use std::str::FromStr;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use confluo_core::{ChannelType, ConfluoError, HealthStatus, Message, OutboundMessage};
use confluo_line::webhook::SIGNATURE_HEADER;
use confluo_resilience::BreakerHealth;

use crate::error::ApiError;
use crate::server::AppState;

/// Query parameters for `GET /v1/messages`.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    /// RFC 3339 lower bound on `timestamp` (inclusive).
    #[serde(default)]
    pub since: Option<String>,
    /// Channel name filter.
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub count: usize,
    pub messages: Vec<Message>,
}

impl From<Vec<Message>> for MessagesResponse {
    fn from(messages: Vec<Message>) -> Self {
        Self {
            count: messages.len(),
            messages,
        }
    }
}

/// Request body for `POST /v1/messages/send`.
#[derive(Debug, Deserialize)]
pub struct SendRequest {
    pub channel: String,
    pub to: String,
    pub content: String,
    /// Subject line, used by Gmail only.
    #[serde(default)]
    pub subject: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub id: String,
    pub channel: ChannelType,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub channel: ChannelType,
    /// Messages returned by the channel.
    pub fetched: usize,
    /// Messages that were not cached yet.
    pub added: usize,
}

/// Request body for `POST /v1/replies/draft`.
#[derive(Debug, Deserialize)]
pub struct DraftRequest {
    pub channel: String,
    pub message_id: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DraftResponse {
    pub message_id: String,
    pub draft: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    pub received: usize,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while any breaker is not closed or any adapter
    /// reports itself less than healthy.
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub cache_size: usize,
    pub breakers: BTreeMap<String, BreakerHealth>,
    pub adapters: BTreeMap<String, HealthStatus>,
}

fn parse_channel(name: &str) -> Result<ChannelType, ApiError> {
    ChannelType::from_str(name.trim())
        .map_err(|_| ConfluoError::Validation(format!("unknown channel: {name}")).into())
}

fn not_configured(channel: ChannelType) -> ApiError {
    ApiError::NotFound(format!("channel {channel} is not configured"))
}

/// GET /health
pub async fn get_health(State(state): State<AppState>) -> Json<HealthResponse> {
    let breakers = state.breaker_health();
    let adapters = state.adapter_health().await;
    let status = if breakers.values().all(BreakerHealth::is_closed)
        && adapters.values().all(HealthStatus::is_healthy)
    {
        "ok"
    } else {
        "degraded"
    };
    Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        cache_size: state.cache.len(),
        breakers,
        adapters,
    })
}

/// GET /v1/messages?since=&channel=
pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let since = match query.since.as_deref().filter(|s| !s.is_empty()) {
        Some(raw) => Some(
            DateTime::parse_from_rfc3339(raw)
                .map_err(|e| ConfluoError::Validation(format!("invalid since '{raw}': {e}")))?
                .with_timezone(&Utc),
        ),
        None => None,
    };
    let channel = match query.channel.as_deref().filter(|s| !s.is_empty()) {
        Some(name) => Some(parse_channel(name)?),
        None => None,
    };
    Ok(Json(state.cache.get(since, channel).into()))
}

/// GET /v1/messages/all
pub async fn get_all_messages(State(state): State<AppState>) -> Json<MessagesResponse> {
    Json(state.cache.get_all().into())
}

/// DELETE /v1/messages
pub async fn clear_messages(State(state): State<AppState>) -> StatusCode {
    state.cache.clear();
    info!("message cache cleared");
    StatusCode::NO_CONTENT
}

/// POST /v1/messages/send
pub async fn send_message(
    State(state): State<AppState>,
    Json(body): Json<SendRequest>,
) -> Result<Json<SendResponse>, ApiError> {
    let channel = parse_channel(&body.channel)?;
    if body.to.trim().is_empty() {
        return Err(ConfluoError::Validation("'to' must not be empty".into()).into());
    }
    if body.content.trim().is_empty() {
        return Err(ConfluoError::Validation("'content' must not be empty".into()).into());
    }
    let route = state.channel(channel).ok_or_else(|| not_configured(channel))?;

    let outbound = OutboundMessage {
        to: body.to,
        content: body.content,
        subject: body.subject,
    };
    let id = route
        .breaker
        .execute(|| route.adapter.send(outbound))
        .await
        .map_err(ConfluoError::from)?;

    info!(channel = %channel, id = %id.0, "message sent");
    Ok(Json(SendResponse { id: id.0, channel }))
}

/// POST /v1/channels/{channel}/sync
pub async fn sync_channel(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SyncResponse>, ApiError> {
    let channel = parse_channel(&name)?;
    let route = state.channel(channel).ok_or_else(|| not_configured(channel))?;

    let messages = route
        .breaker
        .execute(|| route.adapter.fetch_recent())
        .await
        .map_err(ConfluoError::from)?;

    let fetched = messages.len();
    let added = state.cache.add_new(messages);
    debug!(channel = %channel, fetched, added, "channel synced");
    Ok(Json(SyncResponse {
        channel,
        fetched,
        added,
    }))
}

/// POST /v1/replies/draft
pub async fn draft_reply(
    State(state): State<AppState>,
    Json(body): Json<DraftRequest>,
) -> Result<Json<DraftResponse>, ApiError> {
    let channel = parse_channel(&body.channel)?;
    let route = state
        .drafter
        .as_ref()
        .ok_or_else(|| ApiError::Unavailable("reply drafting is not configured".into()))?;
    let message = state.cache.find(channel, &body.message_id).ok_or_else(|| {
        ApiError::NotFound(format!("message {} not found on {channel}", body.message_id))
    })?;

    let instructions = body.instructions.as_deref();
    let draft = route
        .breaker
        .execute(|| route.drafter.draft(&message, instructions))
        .await
        .map_err(ConfluoError::from)?;

    Ok(Json(DraftResponse {
        message_id: message.id,
        draft,
    }))
}

/// POST /webhooks/line
///
/// Authenticated by `X-Line-Signature`, not the bearer token. Every
/// normalized message is added to the cache.
pub async fn post_line_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookResponse>, ApiError> {
    let Some(secret) = state.line_secret.as_deref() else {
        return Err(ApiError::Unauthorized(
            "LINE webhook secret is not configured".into(),
        ));
    };
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !confluo_line::verify_signature(secret, &body, signature) {
        return Err(ApiError::Unauthorized("invalid LINE signature".into()));
    }

    let messages = confluo_line::parse_webhook(&body)?;
    let received = messages.len();
    // LINE redelivers events it considers unacknowledged.
    let added = state.cache.add_new(messages);
    debug!(received, added, "LINE webhook accepted");
    Ok(Json(WebhookResponse { received }))
}
