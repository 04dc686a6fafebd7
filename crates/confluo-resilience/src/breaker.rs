// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The circuit breaker wrapping a single outbound dependency.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::{Clock, TokioClock};
use crate::config::BreakerConfig;
use crate::error::BreakerError;
use crate::state::{self, Admission, CircuitState, Outcome};
use crate::window::{Counter, RollingWindow, WindowStats};

/// Point-in-time view of a breaker, as reported by `/health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerHealth {
    pub is_open: bool,
    pub is_half_open: bool,
    pub stats: WindowStats,
}

impl BreakerHealth {
    pub fn is_closed(&self) -> bool {
        !self.is_open && !self.is_half_open
    }
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    window: RollingWindow,
}

/// Guards calls to one dependency, failing fast once it looks unhealthy.
///
/// All state lives behind a single mutex that is never held across an
/// `.await`, so a breaker can be shared freely between tasks via `Arc`.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner>,
}

impl std::fmt::Debug for CircuitBreaker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

impl CircuitBreaker {
    /// Create a closed breaker reading tokio's clock.
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(name, config, Arc::new(TokioClock))
    }

    /// Create a closed breaker with an explicit time source.
    pub fn with_clock(name: impl Into<String>, config: BreakerConfig, clock: Arc<dyn Clock>) -> Self {
        let window = RollingWindow::new(clock.now(), config.bucket_len(), config.rolling_buckets);
        Self {
            name: name.into(),
            config,
            clock,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                window,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    /// Rolling statistics over the current window.
    pub fn stats(&self) -> WindowStats {
        let now = self.clock.now();
        self.lock().window.totals(now)
    }

    pub fn health_status(&self) -> BreakerHealth {
        let now = self.clock.now();
        let inner = self.lock();
        BreakerHealth {
            is_open: inner.state.is_open(),
            is_half_open: inner.state.is_half_open(),
            stats: inner.window.totals(now),
        }
    }

    /// Run `action` through the breaker.
    ///
    /// The action is not invoked at all when the breaker rejects the call.
    /// Otherwise it runs under the configured timeout and its outcome feeds
    /// the rolling window and the state machine.
    pub async fn execute<F, Fut, T, E>(&self, action: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let admission = self.admit();
        if admission == Admission::Reject {
            return Err(BreakerError::Open {
                name: self.name.clone(),
            });
        }

        let mut guard = ProbeGuard {
            breaker: self,
            armed: admission == Admission::Probe,
        };
        let result = tokio::time::timeout(self.config.timeout, action()).await;
        guard.armed = false;

        match result {
            Ok(Ok(value)) => {
                self.settle(admission, Outcome::Success);
                Ok(value)
            }
            Ok(Err(e)) => {
                self.settle(admission, Outcome::Failure);
                Err(BreakerError::Inner(e))
            }
            Err(_elapsed) => {
                self.settle(admission, Outcome::Timeout);
                Err(BreakerError::Timeout {
                    name: self.name.clone(),
                    timeout: self.config.timeout,
                })
            }
        }
    }

    fn admit(&self) -> Admission {
        let now = self.clock.now();
        let mut inner = self.lock();
        inner.window.record(Counter::Fire, now);

        let before = inner.state;
        let (next, admission) = state::on_attempt(before, now, self.config.reset_timeout);
        inner.state = next;

        match admission {
            Admission::Reject => {
                inner.window.record(Counter::Reject, now);
                debug!(breaker = %self.name, state = before.label(), "call rejected");
            }
            Admission::Probe if !before.is_half_open() => {
                info!(breaker = %self.name, "circuit half-open, admitting probe");
            }
            _ => {}
        }
        admission
    }

    fn settle(&self, admission: Admission, outcome: Outcome) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let counter = match outcome {
            Outcome::Success => Counter::Success,
            Outcome::Failure => Counter::Failure,
            Outcome::Timeout => Counter::Timeout,
        };
        inner.window.record(counter, now);

        let totals = inner.window.totals(now);
        let tripped = totals.exceeds(
            self.config.volume_threshold,
            self.config.error_threshold_percentage,
        );
        let before = inner.state;
        let next = state::on_outcome(before, admission, outcome, tripped, now);
        inner.state = next;

        if before == next {
            return;
        }
        match next {
            CircuitState::Open { .. } => {
                warn!(
                    breaker = %self.name,
                    from = before.label(),
                    failed = totals.failed(),
                    volume = totals.volume(),
                    "circuit opened"
                );
            }
            CircuitState::Closed => {
                inner.window.reset();
                info!(breaker = %self.name, "circuit closed");
            }
            CircuitState::HalfOpen { .. } => {}
        }
    }

    fn abandon_probe(&self) {
        let now = self.clock.now();
        let mut inner = self.lock();
        let before = inner.state;
        inner.state = state::on_probe_abandoned(before, now);
        if inner.state != before {
            warn!(breaker = %self.name, "probe cancelled, circuit re-opened");
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

/// Re-opens the breaker if a probe's future is dropped before it settles.
struct ProbeGuard<'a> {
    breaker: &'a CircuitBreaker,
    armed: bool,
}

impl Drop for ProbeGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.breaker.abandon_probe();
        }
    }
}
