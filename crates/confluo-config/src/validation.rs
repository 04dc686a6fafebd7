// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as a usable bind address, a non-empty cache and consistent breaker windows.

use crate::diagnostic::ConfigError;
use crate::model::{BreakerSettings, ConfluoConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ConfluoConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let host = config.server.host.trim();
    if host.is_empty() {
        errors.push(invalid("server.host must not be empty".to_string()));
    } else {
        let is_valid_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_valid_hostname = host
            .chars()
            .all(|c| c.is_alphanumeric() || c == '.' || c == '-' || c == ':');
        if !is_valid_ip && !is_valid_hostname {
            errors.push(invalid(format!(
                "server.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(invalid(
            "server.request_timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.cache.capacity == 0 {
        errors.push(invalid("cache.capacity must be at least 1".to_string()));
    }

    if config.poll.interval_secs == 0 {
        errors.push(invalid("poll.interval_secs must be greater than 0".to_string()));
    }

    if config.anthropic.max_tokens == 0 {
        errors.push(invalid("anthropic.max_tokens must be greater than 0".to_string()));
    }

    if config.discord.fetch_limit == 0 || config.discord.fetch_limit > 100 {
        errors.push(invalid(format!(
            "discord.fetch_limit must be between 1 and 100, got {}",
            config.discord.fetch_limit
        )));
    }

    for (name, settings) in config.breaker.iter() {
        validate_breaker(name, settings, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(name: &str, settings: &BreakerSettings, errors: &mut Vec<ConfigError>) {
    let prefix = format!("breaker.{name}");

    if settings.timeout_ms == 0 {
        errors.push(invalid(format!("{prefix}.timeout_ms must be greater than 0")));
    }

    let pct = settings.error_threshold_percentage;
    if pct == 0 || pct > 100 {
        errors.push(invalid(format!(
            "{prefix}.error_threshold_percentage must be between 1 and 100, got {pct}"
        )));
    }

    if settings.rolling_buckets == 0 {
        errors.push(invalid(format!("{prefix}.rolling_buckets must be at least 1")));
    } else {
        let buckets = u64::from(settings.rolling_buckets);
        if settings.rolling_window_ms < buckets || settings.rolling_window_ms % buckets != 0 {
            errors.push(invalid(format!(
                "{prefix}.rolling_window_ms ({}) must divide evenly into {} buckets",
                settings.rolling_window_ms, settings.rolling_buckets
            )));
        }
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation { message }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(config: &ConfluoConfig) -> Vec<String> {
        validate_config(config)
            .unwrap_err()
            .into_iter()
            .map(|e| e.to_string())
            .collect()
    }

    #[test]
    fn default_config_validates() {
        let config = ConfluoConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_host_fails_validation() {
        let mut config = ConfluoConfig::default();
        config.server.host = "  ".to_string();
        let errors = messages(&config);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("server.host"));
    }

    #[test]
    fn garbage_host_fails_validation() {
        let mut config = ConfluoConfig::default();
        config.server.host = "not a host!".to_string();
        assert!(messages(&config)[0].contains("not a valid IP"));
    }

    #[test]
    fn zero_capacity_fails_validation() {
        let mut config = ConfluoConfig::default();
        config.cache.capacity = 0;
        assert!(messages(&config)[0].contains("cache.capacity"));
    }

    #[test]
    fn threshold_out_of_range_fails_validation() {
        let mut config = ConfluoConfig::default();
        config.breaker.discord.error_threshold_percentage = 101;
        let errors = messages(&config);
        assert!(errors[0].contains("breaker.discord.error_threshold_percentage"));
    }

    #[test]
    fn uneven_rolling_window_fails_validation() {
        let mut config = ConfluoConfig::default();
        config.breaker.line.rolling_window_ms = 10_001;
        assert!(messages(&config)[0].contains("breaker.line.rolling_window_ms"));
    }

    #[test]
    fn collects_all_errors() {
        let mut config = ConfluoConfig::default();
        config.cache.capacity = 0;
        config.poll.interval_secs = 0;
        config.anthropic.max_tokens = 0;
        config.breaker.gmail.timeout_ms = 0;
        config.breaker.anthropic.rolling_buckets = 0;
        assert_eq!(messages(&config).len(), 5);
    }
}
