// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for Confluo.
//!
//! Serves the cached messages, proxies sends and syncs to the channel
//! adapters through their circuit breakers, drafts replies, and receives
//! LINE webhooks.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use error::ApiError;
pub use server::{AppState, ChannelRoute, DraftRoute, ServerConfig, router, start_server};
