// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit state machine as pure functions of `(state, event, now)`.
//!
//! ```text
//! Closed   --(volume >= threshold && failure% >= threshold)--> Open
//! Open     --(next attempt after reset_timeout)--------------> HalfOpen (probe admitted)
//! HalfOpen --(probe succeeds)--------------------------------> Closed
//! HalfOpen --(probe fails or times out)----------------------> Open
//! ```
//!
//! There is no terminal state and no background timer: `Open` only moves
//! when a caller attempts a call.

use std::time::Duration;

use tokio::time::Instant;

/// Current breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Calls pass through and outcomes are counted.
    Closed,
    /// Calls are rejected until `reset_timeout` has elapsed since `opened_at`.
    Open { opened_at: Instant },
    /// A single probe may run; everything else is rejected while it is in flight.
    HalfOpen { probe_in_flight: bool },
}

impl CircuitState {
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitState::Open { .. })
    }

    pub fn is_half_open(&self) -> bool {
        matches!(self, CircuitState::HalfOpen { .. })
    }

    /// Short lowercase name for logs and health output.
    pub fn label(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open { .. } => "open",
            CircuitState::HalfOpen { .. } => "half_open",
        }
    }
}

/// Decision for a call attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Run the action as a normal closed-state call.
    Pass,
    /// Run the action as the half-open probe.
    Probe,
    /// Do not run the action.
    Reject,
}

/// How an admitted call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    Timeout,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }
}

/// Decide whether a call may run, returning the next state.
pub fn on_attempt(
    state: CircuitState,
    now: Instant,
    reset_timeout: Duration,
) -> (CircuitState, Admission) {
    match state {
        CircuitState::Closed => (state, Admission::Pass),
        CircuitState::Open { opened_at } => {
            if now.saturating_duration_since(opened_at) >= reset_timeout {
                (
                    CircuitState::HalfOpen {
                        probe_in_flight: true,
                    },
                    Admission::Probe,
                )
            } else {
                (state, Admission::Reject)
            }
        }
        CircuitState::HalfOpen {
            probe_in_flight: true,
        } => (state, Admission::Reject),
        CircuitState::HalfOpen {
            probe_in_flight: false,
        } => (
            CircuitState::HalfOpen {
                probe_in_flight: true,
            },
            Admission::Probe,
        ),
    }
}

/// Apply the outcome of an admitted call.
///
/// `tripped` is the rolling-window verdict after recording this outcome; it
/// only matters while `Closed`. Outcomes of ordinary calls that finish after
/// the breaker has already left `Closed` do not move the state.
pub fn on_outcome(
    state: CircuitState,
    admission: Admission,
    outcome: Outcome,
    tripped: bool,
    now: Instant,
) -> CircuitState {
    match (state, admission) {
        (CircuitState::HalfOpen { .. }, Admission::Probe) => {
            if outcome.is_success() {
                CircuitState::Closed
            } else {
                CircuitState::Open { opened_at: now }
            }
        }
        (CircuitState::Closed, Admission::Pass) if tripped => CircuitState::Open { opened_at: now },
        _ => state,
    }
}

/// A probe was abandoned before it settled (its future was dropped).
///
/// The dependency's health is still unknown, so the breaker re-opens and a
/// fresh probe is allowed after another reset timeout.
pub fn on_probe_abandoned(state: CircuitState, now: Instant) -> CircuitState {
    match state {
        CircuitState::HalfOpen { .. } => CircuitState::Open { opened_at: now },
        other => other,
    }
}
