// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Confluo.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Confluo configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfluoConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// In-memory message cache settings.
    #[serde(default)]
    pub cache: CacheConfig,

    /// Background polling of pull-based channels.
    #[serde(default)]
    pub poll: PollConfig,

    /// LINE Messaging API settings.
    #[serde(default)]
    pub line: LineConfig,

    /// Gmail API settings.
    #[serde(default)]
    pub gmail: GmailConfig,

    /// Discord bot settings.
    #[serde(default)]
    pub discord: DiscordConfig,

    /// Anthropic API settings used for reply drafting.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// Per-dependency circuit breaker tuning.
    #[serde(default)]
    pub breaker: BreakersConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes. `None` rejects every request.
    #[serde(default)]
    pub bearer_token: Option<String>,

    /// Upper bound on a single request, including any outbound calls.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_request_timeout_secs() -> u64 {
    60
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Message cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CacheConfig {
    /// Maximum number of messages held in memory.
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

fn default_cache_capacity() -> usize {
    100
}

/// Background poller configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PollConfig {
    #[serde(default = "default_poll_enabled")]
    pub enabled: bool,

    #[serde(default = "default_poll_interval_secs")]
    pub interval_secs: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            enabled: default_poll_enabled(),
            interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_poll_enabled() -> bool {
    true
}

fn default_poll_interval_secs() -> u64 {
    60
}

/// LINE Messaging API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LineConfig {
    /// Long-lived channel access token. `None` disables LINE.
    #[serde(default)]
    pub channel_access_token: Option<String>,

    /// Channel secret used to verify webhook signatures.
    #[serde(default)]
    pub channel_secret: Option<String>,

    #[serde(default = "default_line_api_base")]
    pub api_base: String,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            channel_access_token: None,
            channel_secret: None,
            api_base: default_line_api_base(),
        }
    }
}

fn default_line_api_base() -> String {
    "https://api.line.me".to_string()
}

/// Gmail API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GmailConfig {
    /// OAuth2 access token with the gmail.modify scope. `None` disables Gmail.
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default = "default_gmail_user_id")]
    pub user_id: String,

    /// Gmail search query used when listing messages.
    #[serde(default = "default_gmail_query")]
    pub query: String,

    #[serde(default = "default_gmail_max_results")]
    pub max_results: u32,

    #[serde(default = "default_gmail_api_base")]
    pub api_base: String,

    /// Sender address for outbound mail. Looked up from the account
    /// profile when unset.
    #[serde(default)]
    pub from_address: Option<String>,
}

impl Default for GmailConfig {
    fn default() -> Self {
        Self {
            access_token: None,
            from_address: None,
            user_id: default_gmail_user_id(),
            query: default_gmail_query(),
            max_results: default_gmail_max_results(),
            api_base: default_gmail_api_base(),
        }
    }
}

fn default_gmail_user_id() -> String {
    "me".to_string()
}

fn default_gmail_query() -> String {
    "is:unread in:inbox".to_string()
}

fn default_gmail_max_results() -> u32 {
    20
}

fn default_gmail_api_base() -> String {
    "https://gmail.googleapis.com".to_string()
}

/// Discord bot configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DiscordConfig {
    /// Bot token. `None` disables Discord.
    #[serde(default)]
    pub bot_token: Option<String>,

    /// Channels read by `fetch_recent`.
    #[serde(default)]
    pub channel_ids: Vec<String>,

    /// Messages requested per channel (Discord caps this at 100).
    #[serde(default = "default_discord_fetch_limit")]
    pub fetch_limit: u32,

    #[serde(default = "default_discord_api_base")]
    pub api_base: String,
}

impl Default for DiscordConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_ids: Vec::new(),
            fetch_limit: default_discord_fetch_limit(),
            api_base: default_discord_api_base(),
        }
    }
}

fn default_discord_fetch_limit() -> u32 {
    50
}

fn default_discord_api_base() -> String {
    "https://discord.com/api/v10".to_string()
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` disables reply drafting.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for drafting replies.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum tokens to generate per draft.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default = "default_anthropic_api_base")]
    pub api_base: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            max_tokens: default_max_tokens(),
            api_version: default_api_version(),
            api_base: default_anthropic_api_base(),
        }
    }
}

fn default_model() -> String {
    "claude-sonnet-4-20250514".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_anthropic_api_base() -> String {
    "https://api.anthropic.com".to_string()
}

/// Circuit breaker tuning, one table per protected dependency.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakersConfig {
    #[serde(default)]
    pub line: BreakerSettings,

    #[serde(default = "BreakerSettings::gmail")]
    pub gmail: BreakerSettings,

    #[serde(default)]
    pub discord: BreakerSettings,

    #[serde(default)]
    pub anthropic: BreakerSettings,
}

impl Default for BreakersConfig {
    fn default() -> Self {
        Self {
            line: BreakerSettings::default(),
            gmail: BreakerSettings::gmail(),
            discord: BreakerSettings::default(),
            anthropic: BreakerSettings::default(),
        }
    }
}

impl BreakersConfig {
    /// Settings for each dependency, keyed by its config table name.
    pub fn iter(&self) -> [(&'static str, &BreakerSettings); 4] {
        [
            ("line", &self.line),
            ("gmail", &self.gmail),
            ("discord", &self.discord),
            ("anthropic", &self.anthropic),
        ]
    }
}

/// Circuit breaker settings for a single dependency.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BreakerSettings {
    /// Per-call timeout in milliseconds.
    #[serde(default = "default_breaker_timeout_ms")]
    pub timeout_ms: u64,

    /// Failure percentage (1-100) at which the breaker opens.
    #[serde(default = "default_error_threshold_percentage")]
    pub error_threshold_percentage: u32,

    /// Calls required in the window before the failure ratio counts.
    #[serde(default = "default_volume_threshold")]
    pub volume_threshold: u32,

    /// Time spent open before a probe is allowed, in milliseconds.
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,

    /// Length of the rolling statistics window, in milliseconds.
    #[serde(default = "default_rolling_window_ms")]
    pub rolling_window_ms: u64,

    /// Buckets the rolling window is divided into.
    #[serde(default = "default_rolling_buckets")]
    pub rolling_buckets: u32,
}

impl Default for BreakerSettings {
    fn default() -> Self {
        Self {
            timeout_ms: default_breaker_timeout_ms(),
            error_threshold_percentage: default_error_threshold_percentage(),
            volume_threshold: default_volume_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            rolling_window_ms: default_rolling_window_ms(),
            rolling_buckets: default_rolling_buckets(),
        }
    }
}

impl BreakerSettings {
    /// Gmail list+get round trips are slow, so it gets a longer timeout.
    pub fn gmail() -> Self {
        Self {
            timeout_ms: 30_000,
            ..Self::default()
        }
    }
}

fn default_breaker_timeout_ms() -> u64 {
    10_000
}

fn default_error_threshold_percentage() -> u32 {
    50
}

fn default_volume_threshold() -> u32 {
    5
}

fn default_reset_timeout_ms() -> u64 {
    30_000
}

fn default_rolling_window_ms() -> u64 {
    10_000
}

fn default_rolling_buckets() -> u32 {
    10
}
