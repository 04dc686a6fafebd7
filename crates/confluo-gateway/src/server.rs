// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self as axum_middleware, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use confluo_anthropic::ReplyDrafter;
use confluo_cache::MessageCache;
use confluo_core::{ChannelAdapter, ChannelType, ConfluoError, HealthStatus, PluginAdapter};
use confluo_resilience::{BreakerHealth, CircuitBreaker};

use crate::auth::{AuthConfig, auth_middleware};
use crate::error::ErrorResponse;
use crate::handlers;

/// Webhook and API bodies are small JSON documents.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Upper bound on a single adapter health check during `GET /health`.
const ADAPTER_HEALTH_TIMEOUT: Duration = Duration::from_secs(3);

/// A channel adapter paired with the breaker guarding its outbound calls.
#[derive(Clone)]
pub struct ChannelRoute {
    pub adapter: Arc<dyn ChannelAdapter>,
    pub breaker: Arc<CircuitBreaker>,
}

/// The reply drafter paired with the Anthropic breaker.
#[derive(Clone)]
pub struct DraftRoute {
    pub drafter: Arc<ReplyDrafter>,
    pub breaker: Arc<CircuitBreaker>,
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide message cache shared with the poller.
    pub cache: Arc<MessageCache>,
    /// Configured channels. Unconfigured channels are absent.
    pub channels: Arc<HashMap<ChannelType, ChannelRoute>>,
    /// Reply drafting, if an Anthropic key is configured.
    pub drafter: Option<DraftRoute>,
    /// LINE channel secret for webhook signature checks.
    pub line_secret: Option<String>,
    /// Process start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    pub fn new(cache: Arc<MessageCache>) -> Self {
        Self {
            cache,
            channels: Arc::new(HashMap::new()),
            drafter: None,
            line_secret: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_channel(
        mut self,
        adapter: Arc<dyn ChannelAdapter>,
        breaker: Arc<CircuitBreaker>,
    ) -> Self {
        Arc::make_mut(&mut self.channels)
            .insert(adapter.channel_type(), ChannelRoute { adapter, breaker });
        self
    }

    pub fn with_drafter(mut self, drafter: Arc<ReplyDrafter>, breaker: Arc<CircuitBreaker>) -> Self {
        self.drafter = Some(DraftRoute { drafter, breaker });
        self
    }

    pub fn with_line_secret(mut self, secret: Option<String>) -> Self {
        self.line_secret = secret.filter(|s| !s.is_empty());
        self
    }

    /// Look up a configured channel.
    pub fn channel(&self, channel: ChannelType) -> Option<&ChannelRoute> {
        self.channels.get(&channel)
    }

    /// Health of every breaker in use, keyed by dependency name.
    pub fn breaker_health(&self) -> BTreeMap<String, BreakerHealth> {
        let channels = self.channels.values().map(|route| &route.breaker);
        let drafter = self.drafter.iter().map(|route| &route.breaker);
        channels
            .chain(drafter)
            .map(|breaker| (breaker.name().to_string(), breaker.health_status()))
            .collect()
    }

    /// Run every adapter's health check concurrently, keyed like
    /// [`breaker_health`](Self::breaker_health).
    ///
    /// Checks that error or exceed [`ADAPTER_HEALTH_TIMEOUT`] count as unhealthy.
    pub async fn adapter_health(&self) -> BTreeMap<String, HealthStatus> {
        let channels = join_all(self.channels.iter().map(|(channel, route)| {
            check_adapter(channel.to_string(), route.adapter.as_ref())
        }));
        let drafter = async {
            match &self.drafter {
                Some(route) => {
                    let key = route.breaker.name().to_string();
                    Some(check_adapter(key, route.drafter.as_ref()).await)
                }
                None => None,
            }
        };
        let (channels, drafter) = futures::join!(channels, drafter);
        channels.into_iter().chain(drafter).collect()
    }
}

async fn check_adapter<A: PluginAdapter + ?Sized>(
    key: String,
    adapter: &A,
) -> (String, HealthStatus) {
    let status = match tokio::time::timeout(ADAPTER_HEALTH_TIMEOUT, adapter.health_check()).await {
        Ok(Ok(status)) => status,
        Ok(Err(e)) => HealthStatus::Unhealthy(e.to_string()),
        Err(_) => HealthStatus::Unhealthy("health check timed out".into()),
    };
    (key, status)
}

/// Gateway server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Upper bound on handling a single request.
    pub request_timeout: Duration,
}

/// Build the gateway router.
///
/// - `GET /health` and `POST /webhooks/line` are public
/// - everything under `/v1` requires the bearer token
pub fn router(state: AppState, auth: AuthConfig, request_timeout: Duration) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route("/webhooks/line", post(handlers::post_line_webhook))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route(
            "/v1/messages",
            get(handlers::get_messages).delete(handlers::clear_messages),
        )
        .route("/v1/messages/all", get(handlers::get_all_messages))
        .route("/v1/messages/send", post(handlers::send_message))
        .route("/v1/channels/{channel}/sync", post(handlers::sync_channel))
        .route("/v1/replies/draft", post(handlers::draft_reply))
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(axum_middleware::from_fn_with_state(
            request_timeout,
            timeout_middleware,
        ))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Abort requests that run longer than the configured timeout.
async fn timeout_middleware(
    State(timeout): State<Duration>,
    request: Request,
    next: Next,
) -> Response {
    match tokio::time::timeout(timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => (
            StatusCode::GATEWAY_TIMEOUT,
            axum::Json(ErrorResponse {
                error: format!("request exceeded {}s", timeout.as_secs()),
            }),
        )
            .into_response(),
    }
}

/// Bind and serve the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: AppState,
    auth: AuthConfig,
    cancel: CancellationToken,
) -> Result<(), ConfluoError> {
    let app = router(state, auth, config.request_timeout);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ConfluoError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ConfluoError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use confluo_resilience::BreakerConfig;
    use confluo_test_utils::MockChannel;

    use super::*;

    #[test]
    fn with_channel_registers_by_channel_type() {
        let state = AppState::new(Arc::new(MessageCache::new())).with_channel(
            Arc::new(MockChannel::new(ChannelType::Discord)),
            Arc::new(CircuitBreaker::new("discord", BreakerConfig::default())),
        );
        assert!(state.channel(ChannelType::Discord).is_some());
        assert!(state.channel(ChannelType::Gmail).is_none());

        let health = state.breaker_health();
        assert_eq!(health.len(), 1);
        assert!(health["discord"].is_closed());
    }

    #[test]
    fn empty_line_secret_is_ignored() {
        let state =
            AppState::new(Arc::new(MessageCache::new())).with_line_secret(Some(String::new()));
        assert!(state.line_secret.is_none());
    }

    #[tokio::test]
    async fn start_server_stops_on_cancel() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            request_timeout: Duration::from_secs(5),
        };
        let cancel = CancellationToken::new();
        cancel.cancel();
        let state = AppState::new(Arc::new(MessageCache::new()));
        start_server(&config, state, AuthConfig::default(), cancel)
            .await
            .unwrap();
    }
}
