// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Messages API client and the reply drafter built on it.

pub mod client;
pub mod drafter;
pub mod types;

pub use client::AnthropicClient;
pub use drafter::ReplyDrafter;
