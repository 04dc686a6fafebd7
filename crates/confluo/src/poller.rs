// SPDX-FileCopyrightText: 2026 Confluo Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background polling of pull-based channels into the message cache.

use std::sync::Arc;
use std::time::Duration;

use confluo_cache::MessageCache;
use confluo_core::ConfluoError;
use confluo_gateway::ChannelRoute;
use futures::future::join_all;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Periodically runs `fetch_recent` on each channel through its breaker.
pub struct Poller {
    cache: Arc<MessageCache>,
    routes: Vec<ChannelRoute>,
}

impl Poller {
    pub fn new(cache: Arc<MessageCache>, routes: Vec<ChannelRoute>) -> Self {
        Self { cache, routes }
    }

    /// Poll every channel once, returning how many new messages were cached.
    ///
    /// Messages already cached for the same channel are skipped. A failing
    /// channel is logged and skipped; it never stops the others.
    pub async fn poll_once(&self) -> usize {
        let fetches = self.routes.iter().map(|route| async move {
            let channel = route.adapter.channel_type();
            let result = route
                .breaker
                .execute(|| route.adapter.fetch_recent())
                .await
                .map_err(ConfluoError::from);
            (channel, result)
        });

        let mut added = 0;
        for (channel, result) in join_all(fetches).await {
            match result {
                Ok(messages) => {
                    let fetched = messages.len();
                    let new = self.cache.add_new(messages);
                    debug!(channel = %channel, fetched, new, "poll completed");
                    added += new;
                }
                Err(e) => {
                    warn!(channel = %channel, error = %e, "poll failed (non-fatal)");
                }
            }
        }
        added
    }

    /// Poll on `interval` until `cancel` fires. The first poll runs immediately.
    pub async fn run(self, interval: Duration, cancel: CancellationToken) {
        if self.routes.is_empty() {
            debug!("no pull-based channels configured, poller idle");
            return;
        }
        info!(
            channels = self.routes.len(),
            interval_secs = interval.as_secs(),
            "poller started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.poll_once().await;
                }
                _ = cancel.cancelled() => {
                    info!("poller shutting down");
                    break;
                }
            }
        }
    }
}
