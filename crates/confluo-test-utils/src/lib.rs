// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Confluo integration tests.
//!
//! Provides a mock channel adapter and message builders for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockChannel`] - Mock channel with queued fetch results, failure modes and send capture
//! - [`MessageBuilder`] - Concise construction of normalized [`Message`](confluo_core::Message)s

pub mod builders;
pub mod mock_channel;

pub use builders::{MessageBuilder, message_at};
pub use mock_channel::{MockChannel, MockMode};
