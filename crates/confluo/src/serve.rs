// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `confluo serve` command implementation.
//!
//! Builds the message cache, one circuit breaker per external dependency,
//! the configured channel adapters and the reply drafter, then serves the
//! HTTP gateway alongside the background poller until a shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use confluo_anthropic::ReplyDrafter;
use confluo_cache::MessageCache;
use confluo_config::BreakerSettings;
use confluo_config::model::{ConfluoConfig, LoggingConfig};
use confluo_core::{ChannelAdapter, ChannelType, ConfluoError, PluginAdapter};
use confluo_discord::DiscordChannel;
use confluo_gateway::{AppState, AuthConfig, ServerConfig, start_server};
use confluo_gmail::GmailChannel;
use confluo_line::LineChannel;
use confluo_resilience::{BreakerConfig, CircuitBreaker};
use tracing::{debug, info, warn};

use crate::poller::Poller;
use crate::shutdown;

/// Runs the `confluo serve` command.
pub async fn run_serve(config: ConfluoConfig) -> Result<(), ConfluoError> {
    init_tracing(&config.logging);

    info!(version = env!("CARGO_PKG_VERSION"), "starting confluo serve");

    let cache = Arc::new(MessageCache::with_capacity(config.cache.capacity));
    let state = build_state(&config, Arc::clone(&cache))?;

    let cancel = shutdown::install_signal_handler();

    if config.poll.enabled {
        // LINE is push-only; its messages arrive on the webhook.
        let routes = state
            .channels
            .values()
            .filter(|route| route.adapter.channel_type() != ChannelType::Line)
            .cloned()
            .collect();
        let poller = Poller::new(Arc::clone(&cache), routes);
        let interval = Duration::from_secs(config.poll.interval_secs);
        tokio::spawn(poller.run(interval, cancel.clone()));
    }

    let auth = AuthConfig {
        bearer_token: config.server.bearer_token.clone(),
    };
    if auth.bearer_token.is_none() {
        warn!("server.bearer_token is not set, every /v1 request will be rejected");
    }

    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
        request_timeout: Duration::from_secs(config.server.request_timeout_secs),
    };
    let result = start_server(&server_config, state.clone(), auth, cancel.clone()).await;

    // Stop the poller even when the server exited on its own.
    cancel.cancel();
    for route in state.channels.values() {
        if let Err(e) = route.adapter.shutdown().await {
            warn!(channel = %route.adapter.channel_type(), error = %e, "adapter shutdown failed");
        }
    }

    info!("confluo stopped");
    result
}

/// Assemble the gateway state from configuration.
///
/// Channels without credentials are skipped. Reply drafting is disabled
/// when no Anthropic key can be resolved.
pub fn build_state(config: &ConfluoConfig, cache: Arc<MessageCache>) -> Result<AppState, ConfluoError> {
    let breakers = &config.breaker;
    let mut state =
        AppState::new(cache).with_line_secret(config.line.channel_secret.clone());

    if is_set(&config.line.channel_access_token) {
        state = state.with_channel(
            adapter(LineChannel::new(&config.line)?),
            breaker("line", &breakers.line),
        );
    }
    if is_set(&config.gmail.access_token) {
        state = state.with_channel(
            adapter(GmailChannel::new(config.gmail.clone())?),
            breaker("gmail", &breakers.gmail),
        );
    }
    if is_set(&config.discord.bot_token) {
        state = state.with_channel(
            adapter(DiscordChannel::new(config.discord.clone())?),
            breaker("discord", &breakers.discord),
        );
    }

    match ReplyDrafter::from_config(&config.anthropic) {
        Ok(drafter) => {
            state = state.with_drafter(Arc::new(drafter), breaker("anthropic", &breakers.anthropic));
        }
        Err(e) => {
            info!(reason = %e, "reply drafting disabled");
        }
    }

    let mut enabled: Vec<String> = state.channels.keys().map(ToString::to_string).collect();
    enabled.sort();
    info!(channels = ?enabled, drafting = state.drafter.is_some(), "adapters initialized");
    Ok(state)
}

fn adapter(channel: impl ChannelAdapter) -> Arc<dyn ChannelAdapter> {
    Arc::new(channel)
}

fn breaker(name: &str, settings: &BreakerSettings) -> Arc<CircuitBreaker> {
    let config = breaker_config(settings);
    debug!(
        dependency = name,
        timeout_ms = settings.timeout_ms,
        volume_threshold = settings.volume_threshold,
        "circuit breaker configured"
    );
    Arc::new(CircuitBreaker::new(name, config))
}

/// Convert the `[breaker.*]` settings into the breaker's runtime config.
pub fn breaker_config(settings: &BreakerSettings) -> BreakerConfig {
    BreakerConfig {
        timeout: Duration::from_millis(settings.timeout_ms),
        error_threshold_percentage: settings.error_threshold_percentage,
        volume_threshold: settings.volume_threshold,
        reset_timeout: Duration::from_millis(settings.reset_timeout_ms),
        rolling_window: Duration::from_millis(settings.rolling_window_ms),
        rolling_buckets: settings.rolling_buckets,
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Initializes the tracing subscriber from the `[logging]` section.
///
/// `RUST_LOG` takes precedence over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("confluo={},warn", logging.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn breaker_config_converts_milliseconds() {
        let config = ConfluoConfig::default();
        let gmail = breaker_config(&config.breaker.gmail);
        assert_eq!(gmail.timeout, Duration::from_secs(30));
        assert_eq!(gmail.reset_timeout, Duration::from_secs(30));
        assert_eq!(gmail.rolling_window, Duration::from_secs(10));
        assert_eq!(gmail.rolling_buckets, 10);

        let line = breaker_config(&config.breaker.line);
        assert_eq!(line, BreakerConfig::default());
    }

    #[test]
    fn unconfigured_channels_are_skipped() {
        let config = ConfluoConfig::default();
        let state = build_state(&config, Arc::new(MessageCache::new())).unwrap();
        assert!(state.channels.is_empty());
        assert!(state.line_secret.is_none());
    }

    #[test]
    fn configured_channels_get_their_own_breakers() {
        let mut config = ConfluoConfig::default();
        config.discord.bot_token = Some("bot-token".into());
        config.discord.channel_ids = vec!["123456789".into()];
        config.gmail.access_token = Some("ya29.token".into());
        config.line.channel_access_token = Some("   ".into());

        let state = build_state(&config, Arc::new(MessageCache::new())).unwrap();
        assert_eq!(state.channels.len(), 2);
        assert!(state.channel(ChannelType::Line).is_none());

        let gmail = state.channel(ChannelType::Gmail).unwrap();
        assert_eq!(gmail.breaker.name(), "gmail");
        assert_eq!(gmail.breaker.config().timeout, Duration::from_secs(30));
        let discord = state.channel(ChannelType::Discord).unwrap();
        assert_eq!(discord.breaker.config().timeout, Duration::from_secs(10));
    }

    #[test]
    fn invalid_channel_config_is_an_error() {
        let mut config = ConfluoConfig::default();
        config.discord.bot_token = Some("bot-token".into());
        config.discord.channel_ids = vec!["not-a-snowflake".into()];
        assert!(build_state(&config, Arc::new(MessageCache::new())).is_err());
    }

    #[test]
    fn is_set_ignores_blank_values() {
        assert!(!is_set(&None));
        assert!(!is_set(&Some(" ".into())));
        assert!(is_set(&Some("x".into())));
    }
}
