// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Circuit breaker for Confluo's outbound dependencies.
//!
//! Each dependency (LINE, Gmail, Discord, Anthropic) gets its own
//! [`CircuitBreaker`]. The breaker counts outcomes in a bucketed rolling
//! window, opens once the failure ratio crosses a threshold, and lets a
//! single probe through after a cool-down to decide whether to close again.

pub mod breaker;
pub mod clock;
pub mod config;
pub mod error;
pub mod state;
pub mod window;

pub use breaker::{BreakerHealth, CircuitBreaker};
pub use clock::{Clock, ManualClock, TokioClock};
pub use config::BreakerConfig;
pub use error::BreakerError;
pub use state::CircuitState;
pub use window::WindowStats;
