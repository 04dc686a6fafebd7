// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./confluo.toml` > `~/.config/confluo/confluo.toml` > `/etc/confluo/confluo.toml`
//! with environment variable overrides via `CONFLUO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::ConfluoConfig;

/// Top-level sections addressable from the environment.
const SECTIONS: &[&str] = &[
    "server",
    "logging",
    "cache",
    "poll",
    "line",
    "gmail",
    "discord",
    "anthropic",
];

/// Dependencies under `[breaker.*]`.
const BREAKER_DEPENDENCIES: &[&str] = &["line", "gmail", "discord", "anthropic"];

/// System-wide config path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/confluo/confluo.toml";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "confluo.toml";

/// `~/.config/confluo/confluo.toml`, if a config dir is known.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("confluo/confluo.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/confluo/confluo.toml` (system-wide)
/// 3. `~/.config/confluo/confluo.toml` (user XDG config)
/// 4. `./confluo.toml` (local directory)
/// 5. `CONFLUO_*` environment variables
pub fn load_config() -> Result<ConfluoConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<ConfluoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfluoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ConfluoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ConfluoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
///
/// Returns the Figment before extraction so callers can inspect metadata.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ConfluoConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_FILE))
        .merge(env_provider())
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `CONFLUO_LINE_CHANNEL_SECRET` must map to `line.channel_secret`,
/// not `line.channel.secret`.
fn env_provider() -> Env {
    Env::prefixed("CONFLUO_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}

/// Map a lowercased, prefix-stripped env var name to a dotted config path.
///
/// `breaker_gmail_timeout_ms` becomes `breaker.gmail.timeout_ms`; keys that
/// match no known section are passed through and rejected on extraction.
pub fn map_env_key(key: &str) -> String {
    if let Some(rest) = key.strip_prefix("breaker_") {
        for dependency in BREAKER_DEPENDENCIES {
            if let Some(field) = strip_section(rest, dependency) {
                return format!("breaker.{dependency}.{field}");
            }
        }
    }
    for section in SECTIONS {
        if let Some(field) = strip_section(key, section) {
            return format!("{section}.{field}");
        }
    }
    key.to_string()
}

fn strip_section<'a>(key: &'a str, section: &str) -> Option<&'a str> {
    key.strip_prefix(section)?.strip_prefix('_')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_keys_keep_their_underscores() {
        assert_eq!(map_env_key("line_channel_secret"), "line.channel_secret");
        assert_eq!(
            map_env_key("server_request_timeout_secs"),
            "server.request_timeout_secs"
        );
        assert_eq!(map_env_key("gmail_user_id"), "gmail.user_id");
    }

    #[test]
    fn breaker_keys_get_two_levels() {
        assert_eq!(
            map_env_key("breaker_gmail_timeout_ms"),
            "breaker.gmail.timeout_ms"
        );
        assert_eq!(
            map_env_key("breaker_anthropic_rolling_buckets"),
            "breaker.anthropic.rolling_buckets"
        );
    }

    #[test]
    fn env_provider_maps_uppercase_variables() {
        figment::Jail::expect_with(|jail| {
            jail.set_env("CONFLUO_LINE_CHANNEL_SECRET", "line-secret");
            jail.set_env("CONFLUO_BREAKER_GMAIL_TIMEOUT_MS", "45000");
            jail.set_env("CONFLUO_SERVER_PORT", "8080");

            let config: ConfluoConfig = Figment::new()
                .merge(Serialized::defaults(ConfluoConfig::default()))
                .merge(env_provider())
                .extract()?;

            assert_eq!(config.line.channel_secret.as_deref(), Some("line-secret"));
            assert_eq!(config.breaker.gmail.timeout_ms, 45_000);
            assert_eq!(config.server.port, 8080);
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_pass_through() {
        assert_eq!(map_env_key("nonsense"), "nonsense");
        assert_eq!(map_env_key("linefoo"), "linefoo");
    }
}
