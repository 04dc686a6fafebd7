// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker configuration, fixed at construction.

use std::time::Duration;

/// Tuning for one [`CircuitBreaker`](crate::CircuitBreaker).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Per-call timeout applied to the wrapped action.
    pub timeout: Duration,
    /// Failure percentage (0-100) at or above which the breaker trips.
    pub error_threshold_percentage: u32,
    /// Minimum calls in the rolling window before the ratio is evaluated.
    pub volume_threshold: u32,
    /// How long the breaker stays open before allowing a probe.
    pub reset_timeout: Duration,
    /// Length of the rolling statistics window.
    pub rolling_window: Duration,
    /// Number of buckets the rolling window is split into.
    pub rolling_buckets: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            error_threshold_percentage: 50,
            volume_threshold: 5,
            reset_timeout: Duration::from_secs(30),
            rolling_window: Duration::from_secs(10),
            rolling_buckets: 10,
        }
    }
}

impl BreakerConfig {
    /// Default tuning with a different call timeout.
    ///
    /// Gmail's API is slow enough that it runs with 30s instead of 10s.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            ..Self::default()
        }
    }

    /// Duration covered by a single bucket (never zero).
    pub(crate) fn bucket_len(&self) -> Duration {
        let buckets = self.rolling_buckets.max(1);
        (self.rolling_window / buckets).max(Duration::from_millis(1))
    }
}
